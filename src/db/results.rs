use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::result::{ResultMessage, ResultType, StoredResult};

/// Insert a terminal result, keyed by job id.
///
/// Returns `false` when a row for the job already existed. At-least-once
/// delivery can replay a result message; the first writer wins and replays
/// are dropped silently.
pub async fn insert_result(pool: &PgPool, result: &ResultMessage) -> Result<bool, sqlx::Error> {
    let outcome = sqlx::query(
        r#"
        INSERT INTO conversion_results (job_id, image, result_type)
        VALUES ($1, $2, $3)
        ON CONFLICT (job_id) DO NOTHING
        "#,
    )
    .bind(result.job_id)
    .bind(&result.image)
    .bind(result.result_type.to_string())
    .execute(pool)
    .await?;

    Ok(outcome.rows_affected() > 0)
}

/// Fetch the stored result for a job, if any.
pub async fn get_result(pool: &PgPool, job_id: Uuid) -> Result<Option<StoredResult>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT job_id, image, result_type, created_at
        FROM conversion_results
        WHERE job_id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(r) => {
            let result_type_str: String = r.try_get("result_type")?;
            let result_type = result_type_str
                .parse::<ResultType>()
                .unwrap_or(ResultType::Unresolved);

            Some(StoredResult {
                job_id: r.try_get("job_id")?,
                image: r.try_get("image")?,
                result_type,
                created_at: r.try_get("created_at")?,
            })
        }
        None => None,
    })
}
