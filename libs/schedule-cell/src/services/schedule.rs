use anyhow::{Result, anyhow};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ScheduleSlot, SlotStatus, GenerateSlotsRequest, SlotQuery,
    generate_slot_windows, intervals_overlap,
};

pub struct ScheduleService {
    supabase: SupabaseClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Generates slots for one day from a template, skipping any window
    /// that overlaps a slot already on the calendar.
    pub async fn generate_slots(
        &self,
        user_id: &str,
        request: GenerateSlotsRequest,
        auth_token: &str,
    ) -> Result<Vec<ScheduleSlot>> {
        if request.day_start >= request.day_end {
            return Err(anyhow!("day_start must be before day_end"));
        }
        if request.slot_minutes <= 0 {
            return Err(anyhow!("slot_minutes must be positive"));
        }

        debug!(
            "Generating {}-minute slots on {} for practice {}",
            request.slot_minutes, request.date, user_id
        );

        let existing = self.list_slots(
            user_id,
            SlotQuery {
                from: Some(request.date),
                to: Some(request.date),
                status: None,
            },
            auth_token,
        ).await?;

        let windows = generate_slot_windows(
            request.day_start,
            request.day_end,
            request.slot_minutes,
        );

        let now = Utc::now().to_rfc3339();
        let new_rows: Vec<Value> = windows
            .into_iter()
            .filter(|(start, end)| {
                !existing.iter().any(|slot| {
                    intervals_overlap(*start, *end, slot.start_time, slot.end_time)
                })
            })
            .map(|(start, end)| {
                json!({
                    "id": Uuid::new_v4().to_string(),
                    "user_id": user_id,
                    "date": request.date.format("%Y-%m-%d").to_string(),
                    "start_time": start.format("%H:%M:%S").to_string(),
                    "end_time": end.format("%H:%M:%S").to_string(),
                    "status": SlotStatus::Available.to_string(),
                    "consultation_id": null,
                    "created_at": now,
                    "updated_at": now
                })
            })
            .collect();

        if new_rows.is_empty() {
            return Ok(vec![]);
        }

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/schedule_slots",
            Some(auth_token),
            Some(Value::Array(new_rows)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let slots: Vec<ScheduleSlot> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Generated {} new slots", slots.len());
        Ok(slots)
    }

    pub async fn list_slots(
        &self,
        user_id: &str,
        query: SlotQuery,
        auth_token: &str,
    ) -> Result<Vec<ScheduleSlot>> {
        let mut query_parts = vec![format!("user_id=eq.{}", user_id)];

        if let Some(from) = query.from {
            query_parts.push(format!("date=gte.{}", from.format("%Y-%m-%d")));
        }
        if let Some(to) = query.to {
            query_parts.push(format!("date=lte.{}", to.format("%Y-%m-%d")));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let path = format!(
            "/rest/v1/schedule_slots?{}&order=date.asc,start_time.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        let slots: Vec<ScheduleSlot> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(slots)
    }

    pub async fn get_slot(
        &self,
        user_id: &str,
        slot_id: &str,
        auth_token: &str,
    ) -> Result<ScheduleSlot> {
        let path = format!(
            "/rest/v1/schedule_slots?id=eq.{}&user_id=eq.{}",
            slot_id, user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Slot not found"));
        }

        let slot: ScheduleSlot = serde_json::from_value(result[0].clone())?;
        Ok(slot)
    }

    pub async fn book_slot(
        &self,
        user_id: &str,
        slot_id: &str,
        consultation_id: Uuid,
        auth_token: &str,
    ) -> Result<ScheduleSlot> {
        let slot = self.get_slot(user_id, slot_id, auth_token).await?;

        if slot.status != SlotStatus::Available {
            return Err(anyhow!("Slot is not available"));
        }

        debug!("Booking slot {} for consultation {}", slot_id, consultation_id);

        self.set_slot_state(
            user_id,
            slot_id,
            SlotStatus::Booked,
            Some(consultation_id),
            auth_token,
        ).await
    }

    pub async fn release_slot(
        &self,
        user_id: &str,
        slot_id: &str,
        auth_token: &str,
    ) -> Result<ScheduleSlot> {
        let slot = self.get_slot(user_id, slot_id, auth_token).await?;

        if slot.status != SlotStatus::Booked {
            return Err(anyhow!("Slot is not booked"));
        }

        self.set_slot_state(user_id, slot_id, SlotStatus::Available, None, auth_token).await
    }

    pub async fn block_slot(
        &self,
        user_id: &str,
        slot_id: &str,
        auth_token: &str,
    ) -> Result<ScheduleSlot> {
        let slot = self.get_slot(user_id, slot_id, auth_token).await?;

        if slot.status != SlotStatus::Available {
            return Err(anyhow!("Only available slots can be blocked"));
        }

        self.set_slot_state(user_id, slot_id, SlotStatus::Blocked, None, auth_token).await
    }

    pub async fn unblock_slot(
        &self,
        user_id: &str,
        slot_id: &str,
        auth_token: &str,
    ) -> Result<ScheduleSlot> {
        let slot = self.get_slot(user_id, slot_id, auth_token).await?;

        if slot.status != SlotStatus::Blocked {
            return Err(anyhow!("Slot is not blocked"));
        }

        self.set_slot_state(user_id, slot_id, SlotStatus::Available, None, auth_token).await
    }

    pub async fn delete_slot(
        &self,
        user_id: &str,
        slot_id: &str,
        auth_token: &str,
    ) -> Result<()> {
        let slot = self.get_slot(user_id, slot_id, auth_token).await?;

        if slot.status == SlotStatus::Booked {
            return Err(anyhow!("Cannot delete a booked slot"));
        }

        let path = format!(
            "/rest/v1/schedule_slots?id=eq.{}&user_id=eq.{}",
            slot_id, user_id
        );
        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        Ok(())
    }

    async fn set_slot_state(
        &self,
        user_id: &str,
        slot_id: &str,
        status: SlotStatus,
        consultation_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<ScheduleSlot> {
        let path = format!(
            "/rest/v1/schedule_slots?id=eq.{}&user_id=eq.{}",
            slot_id, user_id
        );
        let update = json!({
            "status": status.to_string(),
            "consultation_id": consultation_id.map(|id| id.to_string()),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Slot not found"));
        }

        let slot: ScheduleSlot = serde_json::from_value(result[0].clone())?;
        Ok(slot)
    }
}
