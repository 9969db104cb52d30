//! Durable recording of recommendation outcomes.
//!
//! One invocation writes inside one transaction: all candidate rows of a
//! success commit together or not at all. Records are inserted once and
//! never updated or deleted here.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::error::RecordError;
use crate::models::{NewRecommendation, STATUS_FAILURE, STATUS_SUCCESS};
use crate::schema::recommendations;
use crate::types::RecommendationOutcome;

/// Request metadata shared by every record of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct RequestMetadata<'a> {
    pub user_id: Option<i64>,
    pub positive_prompt: Option<&'a str>,
    pub negative_prompt: Option<&'a str>,
    pub image_path: Option<&'a str>,
    pub context: Option<&'a str>,
    pub model_name: &'a str,
}

/// Persist one outcome: one row per candidate for a success, exactly one
/// row for a failure. Returns the generated ids in write order.
pub fn record(
    conn: &mut SqliteConnection,
    outcome: &RecommendationOutcome,
    meta: &RequestMetadata,
) -> Result<Vec<i64>, RecordError> {
    let ids = conn.transaction::<_, diesel::result::Error, _>(|conn| match outcome {
        RecommendationOutcome::Success {
            poems,
            image_description,
        } => poems
            .iter()
            .map(|poem| {
                diesel::insert_into(recommendations::table)
                    .values(&NewRecommendation {
                        user_id: meta.user_id,
                        positive_prompt: meta.positive_prompt,
                        negative_prompt: meta.negative_prompt,
                        image_path: meta.image_path,
                        image_description: image_description.as_deref(),
                        context: meta.context,
                        poem_title: Some(&poem.title),
                        poem_content: Some(&poem.content),
                        author: Some(&poem.author),
                        dynasty: Some(&poem.dynasty),
                        appreciation: Some(&poem.appreciation),
                        model_name: Some(meta.model_name),
                        status: STATUS_SUCCESS,
                        error_message: None,
                    })
                    .returning(recommendations::id)
                    .get_result(conn)
            })
            .collect::<Result<Vec<i64>, diesel::result::Error>>(),
        RecommendationOutcome::Failure { error_detail } => {
            let id: i64 = diesel::insert_into(recommendations::table)
                .values(&NewRecommendation {
                    user_id: meta.user_id,
                    positive_prompt: meta.positive_prompt,
                    negative_prompt: meta.negative_prompt,
                    image_path: meta.image_path,
                    image_description: None,
                    context: meta.context,
                    poem_title: None,
                    poem_content: None,
                    author: None,
                    dynasty: None,
                    appreciation: None,
                    model_name: Some(meta.model_name),
                    status: STATUS_FAILURE,
                    error_message: Some(error_detail),
                })
                .returning(recommendations::id)
                .get_result(conn)?;
            Ok(vec![id])
        }
    })?;

    tracing::info!(count = ids.len(), "recommendation records saved");
    Ok(ids)
}

/// Write a failure record without letting a secondary persistence error
/// mask the pipeline error already being reported.
pub fn record_failure_best_effort(
    conn: &mut SqliteConnection,
    error_detail: &str,
    meta: &RequestMetadata,
) {
    let outcome = RecommendationOutcome::Failure {
        error_detail: error_detail.to_string(),
    };
    if let Err(e) = record(conn, &outcome, meta) {
        tracing::warn!(error = %e, "failed to save failure record");
    }
}
