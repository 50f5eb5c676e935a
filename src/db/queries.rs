use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Appointment, AppointmentStatus, Availability, NewAppointment, Provider};
use crate::store::{AppointmentFilter, StoreError};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_ts(dt: &NaiveDateTime) -> String {
    dt.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map_err(|_| StoreError::Corrupt(format!("bad timestamp: {s}")))
}

// ── Providers ──

pub fn save_provider(conn: &Connection, provider: &Provider) -> Result<(), StoreError> {
    let availability = provider
        .availability
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    conn.execute(
        "INSERT INTO providers (id, display_name, availability)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
           display_name = excluded.display_name,
           availability = excluded.availability,
           updated_at = datetime('now')",
        params![provider.id, provider.display_name, availability],
    )?;
    Ok(())
}

pub fn get_provider(conn: &Connection, id: &str) -> Result<Option<Provider>, StoreError> {
    let result = conn.query_row(
        "SELECT id, display_name, availability FROM providers WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        },
    );

    match result {
        Ok((id, display_name, availability_json)) => {
            let availability = availability_json.map(|json| {
                Availability::from_json(&json).unwrap_or_else(|e| {
                    tracing::warn!(provider_id = %id, error = %e, "malformed availability, keeping valid days only");
                    Availability::from_json_lossy(&json)
                })
            });
            Ok(Some(Provider {
                id,
                display_name,
                availability,
            }))
        }
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Appointments ──

const APPOINTMENT_COLUMNS: &str =
    "id, consumer_id, provider_id, service_id, status, scheduled_at, created_at, updated_at";

pub fn insert_appointment(conn: &Connection, new: &NewAppointment) -> Result<Appointment, StoreError> {
    let now = Utc::now().naive_utc();
    let appointment = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        consumer_id: new.consumer_id.clone(),
        provider_id: new.provider_id.clone(),
        service_id: new.service_id.clone(),
        status: AppointmentStatus::Pending,
        scheduled_at: new.scheduled_at,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO appointments (id, consumer_id, provider_id, service_id, status, scheduled_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appointment.id,
            appointment.consumer_id,
            appointment.provider_id,
            appointment.service_id,
            appointment.status.as_str(),
            format_ts(&appointment.scheduled_at),
            format_ts(&appointment.created_at),
            format_ts(&appointment.updated_at),
        ],
    )?;
    Ok(appointment)
}

/// Non-cancelled start times within the local day `[date 00:00, date+1 00:00)`.
/// The last representable date has no next day and is left open-ended.
pub fn get_taken_times(
    conn: &Connection,
    provider_id: &str,
    date: NaiveDate,
) -> Result<Vec<NaiveDateTime>, StoreError> {
    let day_start = format_ts(&date.and_time(NaiveTime::default()));
    let day_end = date.succ_opt().map(|next| format_ts(&next.and_time(NaiveTime::default())));

    let mut stmt = conn.prepare(
        "SELECT scheduled_at FROM appointments
         WHERE provider_id = ?1 AND scheduled_at >= ?2 AND (?3 IS NULL OR scheduled_at < ?3)
           AND status != 'cancelled'
         ORDER BY scheduled_at ASC",
    )?;

    let rows = stmt.query_map(params![provider_id, day_start, day_end], |row| {
        row.get::<_, String>(0)
    })?;

    let mut times = vec![];
    for row in rows {
        times.push(parse_ts(&row?)?);
    }
    Ok(times)
}

pub fn get_appointment(conn: &Connection, id: &str) -> Result<Option<Appointment>, StoreError> {
    let result = conn.query_row(
        &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
        params![id],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Compare-and-set on status. Leaves the row untouched unless it is still `expected`.
pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    expected: AppointmentStatus,
    next: AppointmentStatus,
) -> Result<Appointment, StoreError> {
    let now = format_ts(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![next.as_str(), now, id, expected.as_str()],
    )?;

    let current = get_appointment(conn, id)?
        .ok_or_else(|| StoreError::NotFound(format!("appointment {id}")))?;

    if count == 0 {
        return Err(StoreError::StatusChanged {
            current: current.status,
        });
    }
    Ok(current)
}

pub fn get_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, StoreError> {
    let (column, id) = match filter {
        AppointmentFilter::Consumer(id) => ("consumer_id", id),
        AppointmentFilter::Provider(id) => ("provider_id", id),
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE {column} = ?1 ORDER BY scheduled_at DESC"
    ))?;

    let rows = stmt.query_map(params![id], |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

fn parse_appointment_row(row: &rusqlite::Row) -> Result<Appointment, StoreError> {
    let status_str: String = row.get(4)?;
    let scheduled_at_str: String = row.get(5)?;
    let created_at_str: String = row.get(6)?;
    let updated_at_str: String = row.get(7)?;

    let status = AppointmentStatus::parse(&status_str)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown status: {status_str}")))?;

    Ok(Appointment {
        id: row.get(0)?,
        consumer_id: row.get(1)?,
        provider_id: row.get(2)?,
        service_id: row.get(3)?,
        status,
        scheduled_at: parse_ts(&scheduled_at_str)?,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}
