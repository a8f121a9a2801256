pub mod gateway;
pub mod connection;
pub mod message;
pub mod reminder;

pub use gateway::WhatsAppGatewayClient;
pub use connection::ConnectionService;
pub use message::MessageService;
pub use reminder::ReminderService;
