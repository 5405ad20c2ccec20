use uuid::Uuid;

use crate::campus::CampusState;
use crate::models::{FacultyMember, Student};

const STUDENTS: [(&str, &str); 4] = [
    ("715535243011", "Aparna"),
    ("715525243008", "Amish"),
    ("715525243012", "Arjun"),
    ("715525243010", "Anu"),
];

const DEPARTMENTS: [(&str, &[(&str, &str)]); 3] = [
    ("AI & DS", &[("Dr. Sangeetha", "Dr."), ("Mrs. Nirangana", "Mrs.")]),
    (
        "CSE",
        &[("Dr. Rajesh", "Dr."), ("Prof. Meera", "Prof."), ("Mr. Kannan", "Mr.")],
    ),
    (
        "ECE",
        &[("Dr. Karthik", "Dr."), ("Mrs. Priya", "Mrs."), ("Mr. Sanjay", "Mr.")],
    ),
];

pub fn demo_students() -> Vec<Student> {
    STUDENTS
        .iter()
        .map(|(roll_no, name)| Student {
            roll_no: (*roll_no).to_string(),
            name: (*name).to_string(),
            class: "A".to_string(),
            department: "AI & DS".to_string(),
            year: "3".to_string(),
        })
        .collect()
}

pub fn demo_faculty() -> Vec<FacultyMember> {
    DEPARTMENTS
        .iter()
        .flat_map(|(department, members)| {
            members.iter().map(move |(name, title)| FacultyMember {
                id: format!("faculty-{}", Uuid::new_v4()),
                name: (*name).to_string(),
                title: (*title).to_string(),
                department: (*department).to_string(),
                subjects: Vec::new(),
                schedule: None,
            })
        })
        .collect()
}

pub fn demo_campus() -> CampusState {
    CampusState::with_roster(demo_students(), demo_faculty())
}
