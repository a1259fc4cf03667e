use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};

// === Membership tiers ===

/// Membership level. A member may book any class whose required tier ranks
/// at or below their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Tier {
    Basic,
    Premium,
    Vip,
}

impl Tier {
    pub fn rank(self) -> u8 {
        match self {
            Tier::Basic => 1,
            Tier::Premium => 2,
            Tier::Vip => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Premium => "premium",
            Tier::Vip => "vip",
        }
    }

    pub fn allows(self, required: Tier) -> bool {
        self.rank() >= required.rank()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Tier::Basic),
            "premium" => Ok(Tier::Premium),
            "vip" => Ok(Tier::Vip),
            other => Err(format!("unknown membership tier: {other:?}")),
        }
    }
}

impl TryFrom<String> for Tier {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

// === Members ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub member_id: String,
    pub first_name: String,
    pub last_name: String,
    pub member_status: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    /// Optional fixed id; a random UUID is assigned when absent.
    #[serde(default)]
    pub member_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub member_status: Tier,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub success: bool,
    pub message: String,
    pub member: Member,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub success: bool,
    pub message: String,
    pub members: Vec<Member>,
}

// === Classes and schedules ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub class_id: u64,
    pub class_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: String,
    /// Minimum tier required to book.
    pub premium_status: Tier,
    #[serde(rename = "type", default)]
    pub class_type: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClassRequest {
    pub class_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: String,
    pub premium_status: Tier,
    #[serde(rename = "type", default)]
    pub class_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSchedule {
    pub id: u64,
    pub class_id: u64,
    pub trainer: String,
    pub duration: String,
    pub scheduled_date: NaiveDate,
    pub time_from: NaiveTime,
    pub time_to: NaiveTime,
    pub total_spots: u32,
    #[serde(default)]
    pub taken_spots: u32,
}

impl ClassSchedule {
    pub fn is_full(&self) -> bool {
        self.taken_spots >= self.total_spots
    }

    pub fn validate(&self) -> Result<()> {
        check_schedule(&self.trainer, self.total_spots, self.time_from, self.time_to)
    }
}

/// Shape rules shared by created and seeded schedules.
fn check_schedule(
    trainer: &str,
    total_spots: u32,
    time_from: NaiveTime,
    time_to: NaiveTime,
) -> Result<()> {
    if trainer.trim().is_empty() {
        return Err(AppError::InvalidRequest("trainer is required".into()));
    }
    if total_spots == 0 {
        return Err(AppError::InvalidRequest(
            "total_spots must be positive".into(),
        ));
    }
    if time_to <= time_from {
        return Err(AppError::InvalidRequest(
            "time_to must be after time_from".into(),
        ));
    }
    Ok(())
}

/// A schedule joined with the class it instantiates.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleView {
    #[serde(flatten)]
    pub schedule: ClassSchedule,
    pub class: ClassInfo,
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    pub class_id: u64,
    pub trainer: String,
    #[serde(default)]
    pub duration: String,
    pub scheduled_date: String,
    pub time_from: String,
    pub time_to: String,
    pub total_spots: u32,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub class_id: u64,
    pub trainer: String,
    pub duration: String,
    pub scheduled_date: NaiveDate,
    pub time_from: NaiveTime,
    pub time_to: NaiveTime,
    pub total_spots: u32,
}

impl CreateScheduleRequest {
    pub fn validate(self) -> Result<NewSchedule> {
        let scheduled_date = parse_date(&self.scheduled_date)?;
        let time_from = parse_time(&self.time_from)?;
        let time_to = parse_time(&self.time_to)?;

        check_schedule(&self.trainer, self.total_spots, time_from, time_to)?;

        Ok(NewSchedule {
            class_id: self.class_id,
            trainer: self.trainer,
            duration: self.duration,
            scheduled_date,
            time_from,
            time_to,
            total_spots: self.total_spots,
        })
    }
}

// === Schedule filtering ===

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    pub date: Option<String>,
    pub time_from: Option<String>,
    pub time_to: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ScheduleFilter {
    pub date: Option<NaiveDate>,
    pub time_from: Option<NaiveTime>,
    pub time_to: Option<NaiveTime>,
}

impl ScheduleFilter {
    pub fn matches(&self, schedule: &ClassSchedule) -> bool {
        if let Some(date) = self.date {
            if schedule.scheduled_date != date {
                return false;
            }
        }
        if let Some(from) = self.time_from {
            if schedule.time_from < from {
                return false;
            }
        }
        if let Some(to) = self.time_to {
            if schedule.time_to > to {
                return false;
            }
        }
        true
    }
}

impl TryFrom<ScheduleQuery> for ScheduleFilter {
    type Error = AppError;

    fn try_from(query: ScheduleQuery) -> Result<Self> {
        Ok(Self {
            date: non_blank(query.date.as_deref()).map(parse_date).transpose()?,
            time_from: non_blank(query.time_from.as_deref())
                .map(parse_time)
                .transpose()?,
            time_to: non_blank(query.time_to.as_deref())
                .map(parse_time)
                .transpose()?,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidRequest(format!("invalid date {value:?}, expected YYYY-MM-DD")))
}

pub fn parse_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| AppError::InvalidRequest(format!("invalid time {value:?}, expected HH:MM")))
}

// === Bookings ===

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: u64,
    pub user_id: String,
    pub schedule_id: u64,
    pub booked_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.cancelled_at.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub user_id: String,
    pub schedule_id: u64,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub success: bool,
    pub message: String,
    pub booking: Booking,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub user_id: String,
    pub booking_id: u64,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
    pub booking_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct MyBookingsQuery {
    pub user_id: Option<String>,
    #[serde(default)]
    pub include_cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct BookingsResponse {
    pub success: bool,
    pub message: String,
    pub bookings: Vec<Booking>,
}

// === Seeding ===

/// Fixture loaded at startup. Records keep the ids they are given.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub members: Vec<Member>,
    pub classes: Vec<ClassInfo>,
    pub schedules: Vec<ClassSchedule>,
}

// === Errors ===

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: u32,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
        }
    }
}
