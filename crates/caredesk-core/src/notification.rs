// Notification domain entities
//
// A Notification is one alert for one recipient. Records are created once
// by a domain event, mutated only by the read-state flip (false -> true),
// and ordered for presentation by created_at descending with the
// time-ordered id as tiebreak.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of domain events a notification can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewPatient,
    NewAppointment,
    NewTelemedicineRequest,
    NewMessage,
    AppointmentUpdate,
    AdminReply,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewPatient => "new_patient",
            NotificationKind::NewAppointment => "new_appointment",
            NotificationKind::NewTelemedicineRequest => "new_telemedicine_request",
            NotificationKind::NewMessage => "new_message",
            NotificationKind::AppointmentUpdate => "appointment_update",
            NotificationKind::AdminReply => "admin_reply",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new_patient" => Ok(NotificationKind::NewPatient),
            "new_appointment" => Ok(NotificationKind::NewAppointment),
            "new_telemedicine_request" => Ok(NotificationKind::NewTelemedicineRequest),
            "new_message" => Ok(NotificationKind::NewMessage),
            "appointment_update" => Ok(NotificationKind::AppointmentUpdate),
            "admin_reply" => Ok(NotificationKind::AdminReply),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted alert for one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Notification {
    /// Store-assigned v7 id, time-ordered. Immutable.
    pub id: Uuid,
    /// "admin" sentinel or a patient identifier. Immutable.
    pub recipient_id: String,
    /// Short human-readable headline
    pub title: String,
    /// Longer human-readable description
    pub body: String,
    /// Domain event category
    pub kind: NotificationKind,
    /// Optional deep link the client navigates to on click
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Read flag; transitions false -> true only
    pub read: bool,
    /// Store-assigned creation time, the presentation sort key
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateNotification {
    pub recipient_id: String,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}
