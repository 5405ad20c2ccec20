use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CampusError;

pub const LUNCH_BREAK: &str = "Lunch Break";
pub const LUNCH_PERIOD: &str = "1:00 PM - 2:00 PM";

pub const PERIODS: [&str; 8] = [
    "9:00 AM - 10:00 AM",
    "10:00 AM - 11:00 AM",
    "11:00 AM - 12:00 PM",
    "12:00 PM - 1:00 PM",
    LUNCH_PERIOD,
    "2:00 PM - 3:00 PM",
    "3:00 PM - 4:00 PM",
    "4:00 PM - 5:00 PM",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const TEACHING_DAYS: [Weekday; 6] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
    Weekday::Saturday,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Lunch,
    Class,
    Free,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

impl TimeSlot {
    pub fn lunch(time: &str, period: u8) -> Self {
        TimeSlot {
            time: time.to_string(),
            period: Some(period),
            subject: Some(LUNCH_BREAK.to_string()),
            class_name: None,
            available: None,
        }
    }

    pub fn class(time: &str, period: u8, subject: &str, class_name: &str) -> Self {
        TimeSlot {
            time: time.to_string(),
            period: Some(period),
            subject: Some(subject.to_string()),
            class_name: Some(class_name.to_string()),
            available: None,
        }
    }

    pub fn free(time: &str, period: u8) -> Self {
        TimeSlot {
            time: time.to_string(),
            period: Some(period),
            subject: None,
            class_name: None,
            available: Some(true),
        }
    }

    /// `None` when the slot mixes the shapes of a lunch break, a class and a free period.
    pub fn kind(&self) -> Option<SlotKind> {
        if self.time.trim().is_empty() {
            return None;
        }
        let subject = self.subject.as_deref().filter(|s| !s.trim().is_empty());
        let class_name = self.class_name.as_deref().filter(|c| !c.trim().is_empty());
        let available = self.available.unwrap_or(false);

        match (subject, class_name, available) {
            (Some(LUNCH_BREAK), None, false) => Some(SlotKind::Lunch),
            (Some(_), Some(_), false) => Some(SlotKind::Class),
            (None, None, true) => Some(SlotKind::Free),
            _ => None,
        }
    }
}

/// Weekly timetable keyed by day name. Unknown day names fail to deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule(BTreeMap<Weekday, Vec<TimeSlot>>);

impl Schedule {
    pub fn insert(&mut self, day: Weekday, slots: Vec<TimeSlot>) {
        self.0.insert(day, slots);
    }

    pub fn day(&self, day: Weekday) -> &[TimeSlot] {
        self.0.get(&day).map_or(&[], Vec::as_slice)
    }

    pub fn days(&self) -> impl Iterator<Item = Weekday> + '_ {
        self.0.keys().copied()
    }

    pub fn validate(&self) -> Result<(), CampusError> {
        for day in self.days() {
            if let Some(slot) = self.day(day).iter().find(|slot| slot.kind().is_none()) {
                return Err(CampusError::validation(format!(
                    "{day} slot '{}' must be a lunch break, an assigned class or free",
                    slot.time
                )));
            }
        }
        Ok(())
    }
}

struct CourseLoad {
    subjects: &'static [&'static str],
    classes: &'static [&'static str],
}

fn course_load(faculty_name: &str) -> CourseLoad {
    match faculty_name {
        "Dr. Sangeetha" => CourseLoad {
            subjects: &["Machine Learning", "Deep Learning", "AI Fundamentals", "Data Science"],
            classes: &["AI & DS - III A", "AI & DS - III B", "AI & DS - II A", "AI & DS - IV A"],
        },
        "Mrs. Nirangana" => CourseLoad {
            subjects: &["Python Programming", "Data Structures", "Algorithms", "Database Systems"],
            classes: &["AI & DS - II A", "AI & DS - II B", "AI & DS - III A", "AI & DS - I A"],
        },
        "Dr. Rajesh" => CourseLoad {
            subjects: &["Operating Systems", "Computer Networks", "System Design", "Distributed Systems"],
            classes: &["CSE - III A", "CSE - III B", "CSE - IV A", "CSE - II A"],
        },
        "Prof. Meera" => CourseLoad {
            subjects: &["Software Engineering", "Web Technologies", "Cloud Computing", "Mobile App Dev"],
            classes: &["CSE - II A", "CSE - II B", "CSE - III A", "CSE - IV B"],
        },
        "Mr. Kannan" => CourseLoad {
            subjects: &["Data Mining", "Big Data Analytics", "IoT", "Cyber Security"],
            classes: &["CSE - III B", "CSE - IV A", "CSE - II A", "CSE - III A"],
        },
        "Dr. Karthik" => CourseLoad {
            subjects: &["Digital Electronics", "VLSI Design", "Embedded Systems", "Signal Processing"],
            classes: &["ECE - III A", "ECE - III B", "ECE - IV A", "ECE - II A"],
        },
        "Mrs. Priya" => CourseLoad {
            subjects: &["Communication Systems", "Microprocessors", "Control Systems", "Networks"],
            classes: &["ECE - II A", "ECE - II B", "ECE - III A", "ECE - I A"],
        },
        "Mr. Sanjay" => CourseLoad {
            subjects: &["Electromagnetic Theory", "Antenna Design", "RF Engineering", "Wireless Tech"],
            classes: &["ECE - III B", "ECE - IV A", "ECE - II A", "ECE - III A"],
        },
        _ => CourseLoad {
            subjects: &["Lecture", "Tutorial", "Lab Session"],
            classes: &["Class A", "Class B", "Class C"],
        },
    }
}

/// Deterministic Monday to Saturday timetable shown for faculty without a stored schedule.
pub fn generate_timetable(faculty_name: &str) -> Schedule {
    let load = course_load(faculty_name);
    let mut schedule = Schedule::default();

    for (day_idx, day) in TEACHING_DAYS.into_iter().enumerate() {
        let slots = PERIODS
            .iter()
            .enumerate()
            .zip(1u8..)
            .map(|((slot_idx, time), period)| {
                if *time == LUNCH_PERIOD {
                    TimeSlot::lunch(time, period)
                } else if (day_idx + slot_idx) % 3 != 0 {
                    let subject = load.subjects[(day_idx * slot_idx) % load.subjects.len()];
                    let class_name = load.classes[(day_idx + slot_idx) % load.classes.len()];
                    TimeSlot::class(time, period, subject, class_name)
                } else {
                    TimeSlot::free(time, period)
                }
            })
            .collect();
        schedule.insert(day, slots);
    }

    schedule
}
