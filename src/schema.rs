// Mirrors the table created by `store::mysql::CREATE_TABLE`.

diesel::table! {
    rsvp (id) {
        #[max_length = 12]
        id -> Varchar,
        #[max_length = 32]
        created_at -> Varchar,
        name -> Text,
        guests -> Nullable<Text>,
        kids_count -> Nullable<Integer>,
        #[max_length = 8]
        attendance -> Varchar,
        notes -> Nullable<Text>,
        user_agent -> Nullable<Text>,
        #[max_length = 64]
        ip -> Nullable<Varchar>,
    }
}
