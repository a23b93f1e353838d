use chrono::{Datelike, Duration, Utc, Weekday};
use serde::Serialize;

use crate::models::{Appointment, ServiceType};

/// Slot grid for a working day, two-hour steps.
pub const SLOT_TIMES: [&str; 6] = ["09:00", "11:00", "13:00", "15:00", "17:00", "19:00"];

/// How many days ahead patients can book, starting tomorrow.
pub const SCHEDULE_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialization: String,
    pub description: String,
    pub photo: String,
    pub experience: i64,
    pub education: Vec<String>,
    pub rating: f64,
    pub reviews_count: i64,
}

pub fn doctor_info() -> Doctor {
    Doctor {
        id: "doc-1".into(),
        name: "Dr. Yelzhas Sailaubek".into(),
        specialization: "Kinesiologist".into(),
        description: "Specialist in restoring movement function and correcting posture. \
                      Builds personal rehabilitation programs around correct movement."
            .into(),
        photo: "/doctor-yelzhas.jpeg".into(),
        experience: 12,
        education: vec![
            "Kazakh Academy of Sports and Tourism".into(),
            "Specialization in kinesiology and biomechanics".into(),
            "Certificate in functional testing".into(),
            "Continuing education in rehabilitation".into(),
        ],
        rating: 4.9,
        reviews_count: 183,
    }
}

/// The two bookable services.
pub fn service_types() -> Vec<ServiceType> {
    vec![
        ServiceType {
            id: "diagnosis".into(),
            name: "Diagnostics".into(),
            description: "Functional movement and posture assessment".into(),
            duration: 15,
            price: 5000,
            icon: "🔍".into(),
        },
        ServiceType {
            id: "treatment".into(),
            name: "Kinesiotherapy".into(),
            description: "Therapeutic exercise and movement correction".into(),
            duration: 120,
            price: 20000,
            icon: "🏃‍♂️".into(),
        },
    ]
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: String,
    pub time: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    pub date: String,
    pub day_of_week: String,
    pub day_number: u32,
    pub available: bool,
    pub time_slots: Vec<TimeSlot>,
}

/// Bookable days for the next two weeks. Weekends are closed, and
/// slots held by an appointment in `active` are marked unavailable.
pub fn generate_schedule(active: &[Appointment]) -> Vec<ScheduleDay> {
    let today = Utc::now().date_naive();

    (1..=SCHEDULE_DAYS)
        .map(|offset| {
            let day = today + Duration::days(offset);
            let date = day.format("%Y-%m-%d").to_string();
            let weekend = matches!(day.weekday(), Weekday::Sat | Weekday::Sun);

            let time_slots = SLOT_TIMES
                .iter()
                .map(|&time| {
                    let booked = active.iter().any(|a| a.date == date && a.time == time);
                    TimeSlot {
                        id: format!("{date}-{time}"),
                        time: time.to_string(),
                        available: !weekend && !booked,
                    }
                })
                .collect();

            ScheduleDay {
                date,
                day_of_week: day.format("%a").to_string(),
                day_number: day.day(),
                available: !weekend,
                time_slots,
            }
        })
        .collect()
}
