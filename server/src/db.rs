use chrono::Utc;
use redb::{
    Database as RedbDatabase, MultimapTableDefinition, ReadableMultimapTable, ReadableTable,
    Table, TableDefinition,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, Result};
use crate::models::{
    Booking, ClassInfo, ClassSchedule, CreateClassRequest, Member, NewSchedule, ScheduleFilter,
    ScheduleView, SeedData,
};

// Table definitions
const MEMBERS: TableDefinition<&str, &[u8]> = TableDefinition::new("members");
const CLASSES: TableDefinition<u64, &[u8]> = TableDefinition::new("classes");
const SCHEDULES: TableDefinition<u64, &[u8]> = TableDefinition::new("schedules");
const BOOKINGS: TableDefinition<u64, &[u8]> = TableDefinition::new("bookings");
const MEMBER_BOOKINGS: MultimapTableDefinition<&str, u64> =
    MultimapTableDefinition::new("member_bookings");
// Last id handed out per table
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const CLASS_SEQ: &str = "classes";
const SCHEDULE_SEQ: &str = "schedules";
const BOOKING_SEQ: &str = "bookings";

pub struct Database {
    db: RedbDatabase,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let db = RedbDatabase::create(path)?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MEMBERS)?;
            let _ = write_txn.open_table(CLASSES)?;
            let _ = write_txn.open_table(SCHEDULES)?;
            let _ = write_txn.open_table(BOOKINGS)?;
            let _ = write_txn.open_multimap_table(MEMBER_BOOKINGS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // === Members ===

    pub fn create_member(&self, member: Member) -> Result<Member> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(MEMBERS)?;
            if table.get(member.member_id.as_str())?.is_some() {
                return Err(AppError::MemberExists);
            }
            let json = serde_json::to_vec(&member)?;
            table.insert(member.member_id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(member)
    }

    pub fn get_member(&self, member_id: &str) -> Result<Member> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEMBERS)?;
        read_member(&table, member_id)?.ok_or(AppError::MemberNotFound)
    }

    pub fn list_members(&self) -> Result<Vec<Member>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEMBERS)?;

        let mut members = Vec::new();
        for entry in table.iter()? {
            let (_, data) = entry?;
            members.push(serde_json::from_slice::<Member>(data.value())?);
        }
        members.sort_by(|a, b| {
            (&a.last_name, &a.first_name, &a.member_id).cmp(&(
                &b.last_name,
                &b.first_name,
                &b.member_id,
            ))
        });
        Ok(members)
    }

    // === Classes and schedules ===

    pub fn create_class(&self, req: CreateClassRequest) -> Result<ClassInfo> {
        let write_txn = self.db.begin_write()?;
        let class = {
            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let mut table = write_txn.open_table(CLASSES)?;

            let class = ClassInfo {
                class_id: next_id(&mut sequences, CLASS_SEQ)?,
                class_name: req.class_name,
                description: req.description,
                difficulty: req.difficulty,
                premium_status: req.premium_status,
                class_type: req.class_type,
                created_at: Utc::now(),
            };
            write_json(&mut table, class.class_id, &class)?;
            class
        };
        write_txn.commit()?;
        Ok(class)
    }

    pub fn get_class(&self, class_id: u64) -> Result<ClassInfo> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CLASSES)?;
        read_json(&table, class_id)?.ok_or(AppError::ClassNotFound)
    }

    pub fn create_schedule(&self, new: NewSchedule) -> Result<ScheduleView> {
        let write_txn = self.db.begin_write()?;
        let view = {
            let classes = write_txn.open_table(CLASSES)?;
            let class: ClassInfo =
                read_json(&classes, new.class_id)?.ok_or(AppError::ClassNotFound)?;

            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let mut table = write_txn.open_table(SCHEDULES)?;

            let schedule = ClassSchedule {
                id: next_id(&mut sequences, SCHEDULE_SEQ)?,
                class_id: new.class_id,
                trainer: new.trainer,
                duration: new.duration,
                scheduled_date: new.scheduled_date,
                time_from: new.time_from,
                time_to: new.time_to,
                total_spots: new.total_spots,
                taken_spots: 0,
            };
            write_json(&mut table, schedule.id, &schedule)?;
            ScheduleView { schedule, class }
        };
        write_txn.commit()?;
        Ok(view)
    }

    pub fn get_schedule(&self, schedule_id: u64) -> Result<ClassSchedule> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SCHEDULES)?;
        read_json(&table, schedule_id)?.ok_or(AppError::ScheduleNotFound)
    }

    /// Schedules matching `filter`, each joined with its class, ordered by
    /// date and start time.
    pub fn list_schedules(&self, filter: &ScheduleFilter) -> Result<Vec<ScheduleView>> {
        let read_txn = self.db.begin_read()?;
        let schedules = read_txn.open_table(SCHEDULES)?;
        let classes = read_txn.open_table(CLASSES)?;

        let mut views = Vec::new();
        for entry in schedules.iter()? {
            let (_, data) = entry?;
            let schedule: ClassSchedule = serde_json::from_slice(data.value())?;
            if !filter.matches(&schedule) {
                continue;
            }
            match read_json::<ClassInfo>(&classes, schedule.class_id)? {
                Some(class) => views.push(ScheduleView { schedule, class }),
                None => tracing::warn!(
                    schedule_id = schedule.id,
                    class_id = schedule.class_id,
                    "skipping schedule with missing class"
                ),
            }
        }

        views.sort_by_key(|v| {
            (
                v.schedule.scheduled_date,
                v.schedule.time_from,
                v.schedule.id,
            )
        });
        Ok(views)
    }

    // === Bookings ===

    /// Books `schedule_id` for `user_id`.
    ///
    /// Checks run in order: schedule exists, capacity, member exists, tier,
    /// no active duplicate. The booking insert and the `taken_spots`
    /// increment commit together in one write transaction.
    pub fn book_class(&self, user_id: &str, schedule_id: u64) -> Result<Booking> {
        let write_txn = self.db.begin_write()?;
        let booking = {
            let mut schedules = write_txn.open_table(SCHEDULES)?;
            let mut schedule: ClassSchedule =
                read_json(&schedules, schedule_id)?.ok_or(AppError::ScheduleNotFound)?;
            if schedule.is_full() {
                return Err(AppError::ClassFull);
            }

            let members = write_txn.open_table(MEMBERS)?;
            let member = read_member(&members, user_id)?.ok_or(AppError::MemberNotFound)?;

            let classes = write_txn.open_table(CLASSES)?;
            let class: ClassInfo =
                read_json(&classes, schedule.class_id)?.ok_or(AppError::ClassNotFound)?;
            if !member.member_status.allows(class.premium_status) {
                return Err(AppError::TierTooLow {
                    required: class.premium_status,
                    actual: member.member_status,
                });
            }

            let mut bookings = write_txn.open_table(BOOKINGS)?;
            let mut member_bookings = write_txn.open_multimap_table(MEMBER_BOOKINGS)?;
            for entry in member_bookings.get(user_id)? {
                let booking_id = entry?.value();
                if let Some(existing) = read_json::<Booking>(&bookings, booking_id)? {
                    if existing.schedule_id == schedule_id && existing.is_active() {
                        return Err(AppError::AlreadyBooked);
                    }
                }
            }

            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let booking = Booking {
                id: next_id(&mut sequences, BOOKING_SEQ)?,
                user_id: user_id.to_string(),
                schedule_id,
                booked_at: Utc::now(),
                cancelled_at: None,
            };
            write_json(&mut bookings, booking.id, &booking)?;
            member_bookings.insert(user_id, booking.id)?;

            schedule.taken_spots += 1;
            write_json(&mut schedules, schedule_id, &schedule)?;

            booking
        };
        write_txn.commit()?;

        Ok(booking)
    }

    /// Cancels `booking_id` on behalf of `user_id` and releases its spot.
    pub fn cancel_booking(&self, user_id: &str, booking_id: u64) -> Result<Booking> {
        let write_txn = self.db.begin_write()?;
        let booking = {
            let mut bookings = write_txn.open_table(BOOKINGS)?;
            let mut booking: Booking =
                read_json(&bookings, booking_id)?.ok_or(AppError::BookingNotFound)?;
            if booking.user_id != user_id {
                return Err(AppError::NotBookingOwner);
            }
            if !booking.is_active() {
                return Err(AppError::AlreadyCancelled);
            }

            booking.cancelled_at = Some(Utc::now());
            write_json(&mut bookings, booking_id, &booking)?;

            let mut schedules = write_txn.open_table(SCHEDULES)?;
            match read_json::<ClassSchedule>(&schedules, booking.schedule_id)? {
                Some(mut schedule) => {
                    schedule.taken_spots = schedule.taken_spots.saturating_sub(1);
                    write_json(&mut schedules, schedule.id, &schedule)?;
                }
                None => tracing::warn!(
                    booking_id,
                    schedule_id = booking.schedule_id,
                    "cancelled booking references missing schedule"
                ),
            }

            booking
        };
        write_txn.commit()?;

        Ok(booking)
    }

    /// Bookings made by `user_id`, newest first.
    pub fn member_bookings(&self, user_id: &str, include_cancelled: bool) -> Result<Vec<Booking>> {
        let read_txn = self.db.begin_read()?;
        let members = read_txn.open_table(MEMBERS)?;
        if read_member(&members, user_id)?.is_none() {
            return Err(AppError::MemberNotFound);
        }

        let index = read_txn.open_multimap_table(MEMBER_BOOKINGS)?;
        let bookings = read_txn.open_table(BOOKINGS)?;

        let mut result = Vec::new();
        for entry in index.get(user_id)? {
            let booking_id = entry?.value();
            if let Some(booking) = read_json::<Booking>(&bookings, booking_id)? {
                if include_cancelled || booking.is_active() {
                    result.push(booking);
                }
            }
        }
        result.sort_by(|a, b| b.booked_at.cmp(&a.booked_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    // === Seeding ===

    /// Upserts fixture records in a single transaction, keeping their ids.
    /// Schedules keep the `taken_spots` already stored for them, so seeding
    /// again on restart leaves live bookings consistent.
    pub fn seed(&self, data: SeedData) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut sequences = write_txn.open_table(SEQUENCES)?;

            let mut members = write_txn.open_table(MEMBERS)?;
            for member in &data.members {
                let json = serde_json::to_vec(member)?;
                members.insert(member.member_id.as_str(), json.as_slice())?;
            }

            let mut classes = write_txn.open_table(CLASSES)?;
            for class in &data.classes {
                write_json(&mut classes, class.class_id, class)?;
                bump_sequence(&mut sequences, CLASS_SEQ, class.class_id)?;
            }

            let mut schedules = write_txn.open_table(SCHEDULES)?;
            for schedule in &data.schedules {
                schedule.validate()?;
                if classes.get(schedule.class_id)?.is_none() {
                    return Err(AppError::ClassNotFound);
                }

                // taken_spots tracks live bookings, never the fixture
                let taken_spots = read_json::<ClassSchedule>(&schedules, schedule.id)?
                    .map_or(0, |stored| stored.taken_spots);
                if taken_spots > schedule.total_spots {
                    return Err(AppError::InvalidRequest(format!(
                        "schedule {} already has {} bookings, more than {} spots",
                        schedule.id, taken_spots, schedule.total_spots
                    )));
                }

                let schedule = ClassSchedule {
                    taken_spots,
                    ..schedule.clone()
                };
                write_json(&mut schedules, schedule.id, &schedule)?;
                bump_sequence(&mut sequences, SCHEDULE_SEQ, schedule.id)?;
            }
        }
        write_txn.commit()?;

        tracing::info!(
            members = data.members.len(),
            classes = data.classes.len(),
            schedules = data.schedules.len(),
            "seeded database"
        );
        Ok(())
    }
}

fn read_member(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    member_id: &str,
) -> Result<Option<Member>> {
    match table.get(member_id)? {
        Some(data) => Ok(Some(serde_json::from_slice(data.value())?)),
        None => Ok(None),
    }
}

fn read_json<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<T>> {
    match table.get(id)? {
        Some(data) => Ok(Some(serde_json::from_slice(data.value())?)),
        None => Ok(None),
    }
}

fn write_json<T: Serialize>(
    table: &mut Table<u64, &'static [u8]>,
    id: u64,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_vec(value)?;
    table.insert(id, json.as_slice())?;
    Ok(())
}

fn next_id(sequences: &mut Table<&'static str, u64>, name: &str) -> Result<u64> {
    let last = sequences.get(name)?.map(|v| v.value()).unwrap_or(0);
    let id = last + 1;
    sequences.insert(name, id)?;
    Ok(id)
}

/// Ensures ids handed out later never collide with `used`.
fn bump_sequence(sequences: &mut Table<&'static str, u64>, name: &str, used: u64) -> Result<()> {
    let last = sequences.get(name)?.map(|v| v.value()).unwrap_or(0);
    if used > last {
        sequences.insert(name, used)?;
    }
    Ok(())
}
