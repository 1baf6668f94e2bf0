// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, Transaction, types::Json as SqlJson};

use crate::{
    config::{Config, DEFAULT_ATTEMPT_TTL_SECS},
    error::{AppError, is_unique_violation},
    models::{
        gamification::{EarnedAchievement, StudentProgress},
        lesson::{PublicQuestion, Question},
        quiz::{QuizResponse, SubmitQuizRequest, SubmitQuizResponse},
    },
    services::{
        gamification::{
            find_achievement, level_for_xp, qualifying_achievements, update_streak,
            xp_for_attempt,
        },
        grading::{Grade, grade},
    },
    utils::{
        jwt::{AttemptClaims, AuthStudent, expires_at, sign, verify},
        points::distribute_points,
        sampler::sample_questions,
    },
};

/// Grace period added to timed attempts for slow networks.
const SUBMIT_GRACE_SECS: u64 = 5 * 60;

/// Rejects students whose approval was revoked after they logged in.
async fn ensure_approved(pool: &PgPool, student_id: i64) -> Result<(), AppError> {
    let approved: Option<bool> = sqlx::query_scalar("SELECT approved FROM students WHERE id = $1")
        .bind(student_id)
        .fetch_optional(pool)
        .await?;

    match approved {
        Some(true) => Ok(()),
        Some(false) => Err(AppError::Forbidden("Your account is pending approval".to_string())),
        None => Err(AppError::NotFound("Student not found".to_string())),
    }
}

/// Starts an attempt.
///
/// Samples the lesson's question pool, splits the lesson's points across the
/// served questions and returns them without answers, plus a signed attempt
/// token recording exactly what was served.
pub async fn start_quiz(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    student: AuthStudent,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_approved(&pool, student.id).await?;

    let lesson = super::lessons::fetch_lesson(&pool, lesson_id).await?;
    if !lesson.published {
        return Err(AppError::NotFound("Lesson not found".to_string()));
    }
    if lesson.questions.is_empty() {
        return Err(AppError::BadRequest("This lesson has no questions yet".to_string()));
    }

    let served = {
        let mut rng = rand::thread_rng();
        sample_questions(&lesson.questions, &lesson.pool, &mut rng)
    };
    if served.is_empty() {
        return Err(AppError::BadRequest(
            "The question pool of this lesson selects no questions".to_string(),
        ));
    }

    let points = distribute_points(lesson.total_points, served.len())?;

    let expires_in = lesson
        .time_limit_minutes
        .map(|minutes| minutes.max(1) as u64 * 60 + SUBMIT_GRACE_SECS)
        .unwrap_or(DEFAULT_ATTEMPT_TTL_SECS);

    let claims = AttemptClaims {
        sub: student.id.to_string(),
        attempt_id: uuid::Uuid::new_v4().to_string(),
        lesson_id,
        questions: served
            .iter()
            .zip(&points)
            .map(|(q, p)| (q.id.clone(), *p))
            .collect(),
        exp: expires_at(expires_in)?,
    };
    let attempt_token = sign(&claims, &config.jwt_secret)?;

    let questions = served
        .into_iter()
        .zip(points)
        .map(|(q, points)| PublicQuestion {
            id: q.id,
            question_type: q.question_type,
            text: q.text,
            options: q.options,
            image_url: q.image_url,
            points,
        })
        .collect();

    tracing::info!(
        student_id = student.id,
        lesson_id,
        attempt_id = %claims.attempt_id,
        "Quiz attempt started"
    );

    Ok(Json(QuizResponse {
        lesson_id,
        title: lesson.title,
        questions,
        total_points: lesson.total_points,
        attempt_token,
        expires_in,
    }))
}

/// Submits an attempt.
///
/// * Grades only the questions recorded in the attempt token.
/// * Stores the result, then updates XP, streak and achievements in the same
///   transaction.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    student: AuthStudent,
    Path(lesson_id): Path<i64>,
    Json(req): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims: AttemptClaims = verify(&req.attempt_token, &config.jwt_secret)
        .map_err(|_| AppError::BadRequest("Quiz attempt is invalid or has expired".to_string()))?;

    if claims.sub != student.id.to_string() || claims.lesson_id != lesson_id {
        return Err(AppError::BadRequest(
            "Quiz attempt does not belong to this lesson".to_string(),
        ));
    }

    ensure_approved(&pool, student.id).await?;

    let lesson = super::lessons::fetch_lesson(&pool, lesson_id).await?;
    let bank: HashMap<&str, &Question> = lesson
        .questions
        .iter()
        .map(|q| (q.id.as_str(), q))
        .collect();

    // Questions removed from the lesson since the attempt started are skipped.
    let served: Vec<(&Question, f64)> = claims
        .questions
        .iter()
        .filter_map(|(id, points)| bank.get(id.as_str()).map(|q| (*q, *points)))
        .collect();

    if served.is_empty() {
        return Err(AppError::BadRequest(
            "None of the attempted questions exist anymore".to_string(),
        ));
    }

    let grade = grade(&served, &req.answers);

    let mut tx = pool.begin().await?;
    let response = record_attempt(&mut tx, &student, lesson_id, &claims, &grade, req.time_spent_seconds)
        .await?;
    tx.commit().await?;

    tracing::info!(
        student_id = student.id,
        lesson_id,
        score = grade.score,
        total = grade.total_points,
        xp = response.xp_earned,
        "Quiz submitted"
    );

    Ok(Json(response))
}

#[derive(sqlx::FromRow)]
struct StreakRow {
    xp: i64,
    current_streak: i32,
    longest_streak: i32,
    last_activity_date: Option<chrono::NaiveDate>,
}

async fn record_attempt(
    tx: &mut Transaction<'_, Postgres>,
    student: &AuthStudent,
    lesson_id: i64,
    claims: &AttemptClaims,
    grade: &Grade,
    time_spent_seconds: Option<i32>,
) -> Result<SubmitQuizResponse, AppError> {
    let result_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO results
            (student_id, lesson_id, attempt_id, score, total_points,
             correct_count, question_count, answers, time_spent_seconds)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(student.id)
    .bind(lesson_id)
    .bind(&claims.attempt_id)
    .bind(grade.score)
    .bind(grade.total_points)
    .bind(grade.correct_count as i32)
    .bind(grade.details.len() as i32)
    .bind(SqlJson(&grade.details))
    .bind(time_spent_seconds.filter(|s| *s >= 0))
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("This attempt was already submitted".to_string())
        } else {
            tracing::error!("Failed to store result: {:?}", e);
            AppError::from(e)
        }
    })?;

    // Row lock keeps concurrent submissions from losing XP updates.
    let row = sqlx::query_as::<_, StreakRow>(
        r#"
        SELECT xp, current_streak, longest_streak, last_activity_date
        FROM students WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(student.id)
    .fetch_one(&mut **tx)
    .await?;

    let today = chrono::Utc::now().date_naive();
    let streak = update_streak(
        row.last_activity_date,
        row.current_streak,
        row.longest_streak,
        today,
    );
    let percentage = grade.percentage();
    let xp_earned = xp_for_attempt(percentage, grade.is_perfect(), streak.current);
    let total_xp = row.xp + xp_earned;

    sqlx::query(
        r#"
        UPDATE students
        SET xp = $1, current_streak = $2, longest_streak = $3, last_activity_date = $4
        WHERE id = $5
        "#,
    )
    .bind(total_xp)
    .bind(streak.current)
    .bind(streak.longest)
    .bind(today)
    .bind(student.id)
    .execute(&mut **tx)
    .await?;

    let progress = sqlx::query_as::<_, StudentProgress>(
        r#"
        SELECT
            COUNT(*) AS quiz_count,
            COUNT(*) FILTER (WHERE question_count > 0 AND correct_count = question_count) AS perfect_count
        FROM results
        WHERE student_id = $1
        "#,
    )
    .bind(student.id)
    .fetch_one(&mut **tx)
    .await?;

    let mut new_achievements = Vec::new();
    for code in qualifying_achievements(progress, streak.current, total_xp) {
        let earned_at: Option<chrono::DateTime<chrono::Utc>> = sqlx::query_scalar(
            r#"
            INSERT INTO student_achievements (student_id, code)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            RETURNING earned_at
            "#,
        )
        .bind(student.id)
        .bind(code)
        .fetch_optional(&mut **tx)
        .await?;

        if let (Some(earned_at), Some(achievement)) = (earned_at, find_achievement(code)) {
            new_achievements.push(EarnedAchievement {
                code: code.to_string(),
                title: achievement.title,
                description: achievement.description,
                earned_at,
            });
        }
    }

    Ok(SubmitQuizResponse {
        success: true,
        result_id,
        score: grade.score,
        total_points: grade.total_points,
        percentage,
        correct_count: grade.correct_count,
        question_count: grade.details.len(),
        details: grade.details.clone(),
        xp_earned,
        total_xp,
        level: level_for_xp(total_xp),
        current_streak: streak.current,
        new_achievements,
    })
}
