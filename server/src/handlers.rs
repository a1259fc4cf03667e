use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::models::*;
use crate::AppState;

fn require_user_id(user_id: &str) -> Result<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AppError::InvalidRequest("user_id is required".into()));
    }
    Ok(user_id)
}

fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(format!("{field} is required")));
    }
    Ok(())
}

// === Class schedules ===

pub async fn list_schedules(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ScheduleQuery>,
) -> Result<Json<Vec<ScheduleView>>> {
    let filter = ScheduleFilter::try_from(query)?;
    let schedules = state.db.list_schedules(&filter)?;
    Ok(Json(schedules))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    AppPath(schedule_id): AppPath<u64>,
) -> Result<Json<ScheduleView>> {
    let schedule = state.db.get_schedule(schedule_id)?;
    let class = state.db.get_class(schedule.class_id)?;
    Ok(Json(ScheduleView { schedule, class }))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleView>)> {
    let view = state.db.create_schedule(req.validate()?)?;
    tracing::info!(
        schedule_id = view.schedule.id,
        class_id = view.class.class_id,
        date = %view.schedule.scheduled_date,
        "created class schedule"
    );
    Ok((StatusCode::CREATED, Json(view)))
}

// === Classes ===

pub async fn create_class(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateClassRequest>,
) -> Result<(StatusCode, Json<ClassInfo>)> {
    require_text(&req.class_name, "class_name")?;

    let class = state.db.create_class(req)?;
    tracing::info!(class_id = class.class_id, name = %class.class_name, "created class");
    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn get_class(
    State(state): State<AppState>,
    AppPath(class_id): AppPath<u64>,
) -> Result<Json<ClassInfo>> {
    Ok(Json(state.db.get_class(class_id)?))
}

// === Bookings ===

pub async fn book_class(
    State(state): State<AppState>,
    AppJson(req): AppJson<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>)> {
    let user_id = require_user_id(&req.user_id)?;

    let booking = state
        .db
        .book_class(user_id, req.schedule_id)
        .inspect_err(|err| {
            tracing::debug!(user_id, schedule_id = req.schedule_id, error = %err, "booking rejected")
        })?;

    tracing::info!(
        user_id,
        schedule_id = booking.schedule_id,
        booking_id = booking.id,
        "class booked"
    );
    Ok((
        StatusCode::CREATED,
        Json(BookResponse {
            success: true,
            message: "Class booked successfully".into(),
            booking,
        }),
    ))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    AppJson(req): AppJson<CancelRequest>,
) -> Result<Json<CancelResponse>> {
    let user_id = require_user_id(&req.user_id)?;

    let booking = state
        .db
        .cancel_booking(user_id, req.booking_id)
        .inspect_err(|err| {
            tracing::debug!(user_id, booking_id = req.booking_id, error = %err, "cancellation rejected")
        })?;

    tracing::info!(
        user_id,
        schedule_id = booking.schedule_id,
        booking_id = booking.id,
        "booking cancelled"
    );
    Ok(Json(CancelResponse {
        success: true,
        message: "Booking cancelled successfully".into(),
        booking_id: booking.id,
    }))
}

pub async fn my_bookings(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MyBookingsQuery>,
) -> Result<Json<BookingsResponse>> {
    let user_id = require_user_id(query.user_id.as_deref().unwrap_or_default())?;

    let bookings = state.db.member_bookings(user_id, query.include_cancelled)?;
    Ok(Json(BookingsResponse {
        success: true,
        message: format!("Found {} bookings", bookings.len()),
        bookings,
    }))
}

// === Members ===

pub async fn list_members(State(state): State<AppState>) -> Result<Json<MembersResponse>> {
    let members = state.db.list_members()?;
    Ok(Json(MembersResponse {
        success: true,
        message: format!("Found {} members", members.len()),
        members,
    }))
}

pub async fn get_member(
    State(state): State<AppState>,
    AppPath(member_id): AppPath<String>,
) -> Result<Json<MemberResponse>> {
    let member = state.db.get_member(&member_id)?;
    Ok(Json(MemberResponse {
        success: true,
        message: "Member found".into(),
        member,
    }))
}

pub async fn create_member(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>)> {
    require_text(&req.first_name, "first_name")?;
    require_text(&req.last_name, "last_name")?;

    let member_id = match req.member_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Uuid::parse_str(id)
            .map_err(|_| AppError::InvalidRequest(format!("invalid member_id {id:?}")))?
            .to_string(),
        _ => Uuid::new_v4().to_string(),
    };

    let member = state.db.create_member(Member {
        member_id,
        first_name: req.first_name,
        last_name: req.last_name,
        member_status: req.member_status,
        email: req.email,
        created_at: chrono::Utc::now(),
    })?;

    tracing::info!(member_id = %member.member_id, tier = %member.member_status, "created member");
    Ok((
        StatusCode::CREATED,
        Json(MemberResponse {
            success: true,
            message: "Member created".into(),
            member,
        }),
    ))
}

// === Health check ===

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "FitHub booking API is running" }))
}

pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "state": "OK" }))
}
