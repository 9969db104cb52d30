use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Status column values for recommendation records.
pub const STATUS_SUCCESS: i32 = 1;
pub const STATUS_FAILURE: i32 = 0;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::recommendations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Recommendation {
    pub id: i64,
    pub user_id: Option<i64>,
    pub positive_prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub image_path: Option<String>,
    pub image_description: Option<String>,
    pub context: Option<String>,
    pub poem_title: Option<String>,
    pub poem_content: Option<String>,
    pub author: Option<String>,
    pub dynasty: Option<String>,
    pub appreciation: Option<String>,
    pub model_name: Option<String>,
    pub model_version: Option<String>,
    pub status: i32,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recommendations)]
pub struct NewRecommendation<'a> {
    pub user_id: Option<i64>,
    pub positive_prompt: Option<&'a str>,
    pub negative_prompt: Option<&'a str>,
    pub image_path: Option<&'a str>,
    pub image_description: Option<&'a str>,
    pub context: Option<&'a str>,
    pub poem_title: Option<&'a str>,
    pub poem_content: Option<&'a str>,
    pub author: Option<&'a str>,
    pub dynasty: Option<&'a str>,
    pub appreciation: Option<&'a str>,
    pub model_name: Option<&'a str>,
    pub status: i32,
    pub error_message: Option<&'a str>,
}
