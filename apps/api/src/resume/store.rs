use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::resume::models::{ResumeRow, ResumeSummaryRow, ResumeUpdate, Template};

/// Inserts a new resume with every section empty and the default template.
/// `name` and `email` are optional prefills from the caller's profile.
pub async fn create_resume(
    pool: &PgPool,
    user_id: Uuid,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<ResumeRow, AppError> {
    let row = sqlx::query_as::<_, ResumeRow>(
        r#"
        INSERT INTO resumes
            (id, user_id, name, email, template,
             experiences, skills, education, languages, additional_info)
        VALUES ($1, $2, $3, $4, $5, '[]', '[]', '[]', '[]', '[]')
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .bind(email)
    .bind(Template::default().as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_resume(pool: &PgPool, resume_id: Uuid) -> Result<Option<ResumeRow>, AppError> {
    Ok(
        sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
            .bind(resume_id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Loads a resume and enforces that `user_id` owns it.
/// Ownership is checked before anything else touches the record.
pub async fn load_owned(
    pool: &PgPool,
    resume_id: Uuid,
    user_id: Uuid,
) -> Result<ResumeRow, AppError> {
    let resume = get_resume(pool, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    ensure_owner(&resume, user_id)?;
    Ok(resume)
}

/// Pure ownership check, split out so it is directly testable.
pub fn ensure_owner(resume: &ResumeRow, user_id: Uuid) -> Result<(), AppError> {
    if resume.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Replaces every user-writable field in one statement (full-section
/// replacement, no partial patch). `photo_file_name` is untouched here; it
/// is system-derived and has its own write path.
pub async fn update_resume(
    pool: &PgPool,
    resume_id: Uuid,
    update: &ResumeUpdate,
) -> Result<ResumeRow, AppError> {
    let row = sqlx::query_as::<_, ResumeRow>(
        r#"
        UPDATE resumes
        SET name = $2, headline = $3, email = $4, phone = $5, location = $6,
            linkedin = $7, summary = $8, template = $9, experiences = $10,
            skills = $11, education = $12, languages = $13,
            additional_info = $14, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(resume_id)
    .bind(&update.name)
    .bind(&update.headline)
    .bind(&update.email)
    .bind(&update.phone)
    .bind(&update.location)
    .bind(&update.linkedin)
    .bind(&update.summary)
    .bind(update.template.as_str())
    .bind(Json(&update.experiences))
    .bind(Json(&update.skills))
    .bind(Json(&update.education))
    .bind(Json(&update.languages))
    .bind(Json(&update.additional_info))
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// System write path for the photo filename. Deliberately separate from
/// [`update_resume`] so user input can never reach this column.
pub async fn set_photo_file_name(
    pool: &PgPool,
    resume_id: Uuid,
    file_name: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE resumes SET photo_file_name = $2, updated_at = now() WHERE id = $1")
        .bind(resume_id)
        .bind(file_name)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn delete_resume(pool: &PgPool, resume_id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM resumes WHERE id = $1")
        .bind(resume_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Ownership-scoped listing, most recently updated first.
pub async fn list_resumes(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<ResumeSummaryRow>, AppError> {
    Ok(sqlx::query_as::<_, ResumeSummaryRow>(
        r#"
        SELECT id, name, headline, updated_at
        FROM resumes
        WHERE user_id = $1
        ORDER BY updated_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}
