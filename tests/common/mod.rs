#![allow(dead_code)]

use paramquery::prelude::*;

paramquery::entity! {
    pub struct Student => "PQ_Student" {
        Id: Int => "student_id" [primary_key],
        FirstName: Text => "first_name",
        LastName: Text => "last_name",
        DateOfBirth: DateTime => "birth_date",
        ClassRoomId: Int => "class_room_id",
    }

    pub struct ClassRoom => "PQ_ClassRoom" {
        Id: Int => "class_room_id" [primary_key],
        Grade: Int => "grade",
        Section: Char => "section",
    }

    pub struct ClassTeacherInfo => "PQ_ClassTeacherInfo" {
        ClassRoomId: Int => "class_room_id",
        TeacherId: Int => "teacher_id",
    }

    pub struct Teacher => "PQ_Teacher" {
        Id: Int => "teacher_id" [primary_key],
        Name: Text => "teacher_name",
    }
}

/// Builder with `s`, `c`, `ct` and `t` registered.
pub fn school_query() -> ParameterizedQuery {
    ParameterizedQuery::new()
        .table_aliases([
            (Student::entity(), "s"),
            (ClassRoom::entity(), "c"),
            (ClassTeacherInfo::entity(), "ct"),
            (Teacher::entity(), "t"),
        ])
        .expect("aliases register")
}

/// Everything after the `where` line.
pub fn where_block(query: &str) -> &str {
    query.split_once("where\n").map(|(_, rest)| rest).unwrap_or("")
}
