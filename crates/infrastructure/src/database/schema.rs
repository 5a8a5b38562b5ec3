// Database schema for the user service
diesel::table! {
    users (seq) {
        seq -> Integer,            // Insertion order
        id -> Text,                // Hyphenated UUID, unique
        name -> Text,
        email -> Text,             // Stored lower-cased, unique
    }
}

pub const CREATE_USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE
    );
";
