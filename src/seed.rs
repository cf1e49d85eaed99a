use crate::models::{Role, Student, User};
use crate::store::{self, Collection, StoreResult};
use rusqlite::Connection;

/// Inserts `defaults` only when the collection is empty. Returns how many
/// records were written (0 when the collection already had data).
pub fn seed_if_empty<C: Collection + Clone>(
    conn: &Connection,
    defaults: &[C],
) -> StoreResult<usize> {
    if store::count::<C>(conn)? != 0 {
        tracing::debug!(collection = C::NAME, "seed skipped, collection not empty");
        return Ok(0);
    }
    for record in defaults {
        store::add(conn, record)?;
    }
    tracing::info!(collection = C::NAME, records = defaults.len(), "seeded collection");
    Ok(defaults.len())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub students: usize,
}

/// Seeds the baseline users and roster. Safe to run on every start.
pub fn seed_defaults(conn: &Connection) -> StoreResult<SeedReport> {
    Ok(SeedReport {
        users: seed_if_empty(conn, &default_users())?,
        students: seed_if_empty(conn, &default_students())?,
    })
}

pub fn default_users() -> Vec<User> {
    [
        ("Admin1", Role::Admin, "admin123"),
        ("Staff1", Role::Staff, "staff123"),
    ]
    .into_iter()
    .map(|(name, role, password)| User {
        id: None,
        name: name.to_string(),
        role,
        password: password.to_string(),
    })
    .collect()
}

pub fn default_students() -> Vec<Student> {
    [
        (1, "Arun Kumar", 6, 601),
        (2, "Priyadharshini", 6, 602),
        (3, "Karthick", 6, 603),
        (4, "Kavin", 7, 704),
        (5, "Kishore", 7, 703),
        (6, "Kavya", 8, 802),
        (7, "Kavimitraa", 8, 801),
        (8, "Jamuna", 8, 803),
        (9, "Kiruba", 9, 901),
        (10, "Naveen", 9, 902),
        (11, "Ravi Teja", 6, 604),
        (12, "Janaki", 7, 702),
        (13, "Sabarish", 7, 701),
        (14, "Thulasi", 8, 804),
        (15, "Abhinav", 9, 903),
        (16, "Priyanka", 9, 904),
        (17, "Gokul", 10, 1001),
        (18, "Gobika", 10, 1002),
        (19, "Jana", 10, 1003),
        (20, "Premja", 10, 1004),
    ]
    .into_iter()
    .map(|(student_id, name, class, roll_no)| Student {
        student_id,
        name: name.to_string(),
        class,
        roll_no,
    })
    .collect()
}
