// Backend record types.
// One struct per collection exposed by the hosted backend.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Record identifier; the backend uses integer or string keys depending on the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

/// A row in one of the backend collections.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection (table) name, also the endpoint path segment.
    const COLLECTION: &'static str;

    fn id(&self) -> Option<&RecordId>;

    /// Required fields that are empty. An empty list means the record can be saved.
    fn missing_fields(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

fn blank(fields: &[(&'static str, &str)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

/// Travel destination shown on the marketing site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Destination {
    const COLLECTION: &'static str = "destinations";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        blank(&[("name", self.name.as_str()), ("country", self.country.as_str())])
    }
}

/// Bookable tour package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelPackage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub title: String,
    pub destination_id: Option<RecordId>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for TravelPackage {
    const COLLECTION: &'static str = "packages";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = blank(&[("title", self.title.as_str()), ("description", self.description.as_str())]);
        if self.price <= 0.0 {
            missing.push("price");
        }
        if self.duration_days == 0 {
            missing.push("duration_days");
        }
        missing
    }
}

/// Booking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Customer booking request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub package_id: Option<RecordId>,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_travelers")]
    pub travelers: u32,
    pub travel_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: BookingStatus,
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_travelers() -> u32 {
    1
}

impl Record for Booking {
    const COLLECTION: &'static str = "bookings";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = blank(&[
            ("full_name", self.full_name.as_str()),
            ("email", self.email.as_str()),
            ("phone", self.phone.as_str()),
        ]);
        if self.travelers == 0 {
            missing.push("travelers");
        }
        missing
    }
}

/// Customer testimonial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    pub location: Option<String>,
    pub content: String,
    #[serde(default)]
    pub rating: u8,
    pub image_url: Option<String>,
    #[serde(default)]
    pub approved: bool,
}

impl Record for Testimonial {
    const COLLECTION: &'static str = "testimonials";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = blank(&[("name", self.name.as_str()), ("content", self.content.as_str())]);
        if !(1..=5).contains(&self.rating) {
            missing.push("rating");
        }
        missing
    }
}

/// Gallery photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub title: String,
    pub image_url: String,
    pub category: Option<String>,
}

impl Record for GalleryItem {
    const COLLECTION: &'static str = "gallery";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        blank(&[("image_url", self.image_url.as_str())])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl Record for Faq {
    const COLLECTION: &'static str = "faqs";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        blank(&[("question", self.question.as_str()), ("answer", self.answer.as_str())])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    pub author: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl Record for BlogPost {
    const COLLECTION: &'static str = "blog_posts";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        blank(&[
            ("title", self.title.as_str()),
            ("slug", self.slug.as_str()),
            ("content", self.content.as_str()),
        ])
    }
}

/// Back-office role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    SuperAdmin,
    #[default]
    Admin,
    Editor,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: AdminRole,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Record for AdminUser {
    const COLLECTION: &'static str = "admin_users";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = blank(&[("email", self.email.as_str())]);
        if !self.email.trim().is_empty() && !self.email.contains('@') {
            missing.push("email");
        }
        missing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
    #[serde(other)]
    Unknown,
}

/// Support ticket raised from the contact form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportTicket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub priority: TicketPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for SupportTicket {
    const COLLECTION: &'static str = "support_tickets";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        blank(&[
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("subject", self.subject.as_str()),
            ("message", self.message.as_str()),
        ])
    }
}

/// Key/value site setting (contact details, hero text, social links).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSetting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

impl Record for SiteSetting {
    const COLLECTION: &'static str = "site_settings";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        blank(&[("key", self.key.as_str())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_accepts_numbers_and_strings() {
        let numeric: RecordId = serde_json::from_value(json!(7)).unwrap();
        let text: RecordId = serde_json::from_value(json!("b2c1")).unwrap();
        assert_eq!(numeric, RecordId::Int(7));
        assert_eq!(text.to_string(), "b2c1");
    }

    #[test]
    fn test_package_deserializes_with_defaults() {
        let package: TravelPackage = serde_json::from_value(json!({
            "id": 1,
            "title": "Kashmir Bliss",
            "destination_id": null,
            "price": 45999.0,
            "duration_days": 6,
            "image_url": null
        }))
        .unwrap();
        assert_eq!(package.id, Some(RecordId::Int(1)));
        assert!(!package.featured);
        assert_eq!(package.missing_fields(), vec!["description"]);
    }

    #[test]
    fn test_booking_required_fields() {
        let booking = Booking {
            id: None,
            package_id: Some(RecordId::Int(1)),
            full_name: "Asha Rao".to_string(),
            email: " ".to_string(),
            phone: String::new(),
            travelers: 2,
            travel_date: None,
            status: BookingStatus::Pending,
            message: None,
            created_at: None,
        };
        assert_eq!(booking.missing_fields(), vec!["email", "phone"]);
    }

    #[test]
    fn test_unknown_enum_values_are_tolerated() {
        let ticket: SupportTicket = serde_json::from_value(json!({
            "name": "Ravi",
            "email": "ravi@example.com",
            "subject": "Refund",
            "message": "Please help",
            "status": "escalated",
            "priority": "high"
        }))
        .unwrap();
        assert_eq!(ticket.status, TicketStatus::Unknown);
        assert_eq!(ticket.priority, TicketPriority::High);
        assert!(ticket.missing_fields().is_empty());
    }

    #[test]
    fn test_id_is_omitted_when_creating() {
        let faq = Faq {
            id: None,
            question: "Do you arrange visas?".to_string(),
            answer: "Yes".to_string(),
            category: None,
            sort_order: 0,
        };
        let value = serde_json::to_value(&faq).unwrap();
        assert!(value.get("id").is_none());
    }
}
