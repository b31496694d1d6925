//! Unique Key Rebuild Tool
//!
//! Recomputes every row of `submission_unique_keys` from the stored
//! submissions and the current form schemas.
//!
//! Usage:
//!   cargo run --bin rebuild_unique_keys -- --database-url postgres://... [options]
//!
//! Options:
//! - `--strict` (default) aborts when two submissions share a key value
//! - `--keep-first` keeps the oldest submission's key and skips the rest
//! - `--assign-missing` picks a unique key field for forms that have none
//! - `--dry-run` reports without committing

use clap::Parser;
use database_layer::{
    insert_key_rows, mask_url, stored_submissions, DatabasePool, Form, PgUniqueKeyIndex,
};
use form_integrity::{
    key_name_for, mark_unique_field, plan_rebuild, suggest_unique_field, FormSchema,
    IntegrityError, Payload, RebuildMode, StoredSubmission, UniqueKeyIndex,
};
use logger_redacted::{init_tracing, LoggerConfig, PiiRedactor};
use sqlx::PgConnection;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "rebuild_unique_keys")]
#[command(about = "Rebuild the submission unique key index from stored submissions")]
struct Args {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Abort on duplicate key values (default)
    #[arg(long, conflicts_with = "keep_first")]
    strict: bool,

    /// Keep the oldest submission of each duplicate key and skip the others
    #[arg(long)]
    keep_first: bool,

    /// Mark a unique key field on forms that have none
    #[arg(long)]
    assign_missing: bool,

    /// Report what would change without committing
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn mode(&self) -> RebuildMode {
        if self.keep_first && !self.strict {
            RebuildMode::KeepFirst
        } else {
            RebuildMode::Strict
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let logging = LoggerConfig::default();
    init_tracing(
        &logging,
        &["rebuild_unique_keys", "database_layer", "form_integrity"],
        args.verbose,
    )?;
    let redactor = PiiRedactor::new(logging.redaction());

    info!("Starting unique key rebuild");
    info!("Database: {}", mask_url(&args.database_url));
    info!("Mode: {:?}", args.mode());
    info!("Dry run: {}", args.dry_run);

    let db = DatabasePool::new(&args.database_url).await?;
    let mut tx = db.pool().begin().await?;

    let forms = sqlx::query_as::<_, Form>(
        r#"
        SELECT id, name, description, schema_json, created_by, created_at, updated_at
        FROM forms
        ORDER BY created_at ASC, id ASC
        FOR UPDATE
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;
    let submissions = stored_submissions(&mut *tx, None).await?;
    info!(forms = forms.len(), submissions = submissions.len(), "Loaded forms and submissions");

    let mut schemas = Vec::with_capacity(forms.len());
    for form in &forms {
        let mut schema = form.schema();
        if !schema.has_unique_key() && args.assign_missing {
            assign_unique_field(&mut *tx, form, &mut schema, &submissions).await?;
        }
        schemas.push((form.id, schema));
    }

    let plan = match plan_rebuild(&schemas, &submissions, args.mode()) {
        Ok(plan) => plan,
        Err(IntegrityError::DuplicatesFound(duplicates)) => {
            for duplicate in &duplicates {
                error!(
                    form_id = %duplicate.form_id,
                    key_name = %duplicate.key_name,
                    key_value = %redactor.redact_key_value(&duplicate.key_value),
                    kept = %duplicate.kept_submission_id,
                    duplicate = %duplicate.duplicate_submission_id,
                    "Duplicate unique key value"
                );
            }
            tx.rollback().await?;
            anyhow::bail!(
                "{} duplicate unique key value(s) found; resolve them or rerun with --keep-first",
                duplicates.len()
            );
        }
        Err(e) => return Err(e.into()),
    };

    for form_id in &plan.forms_without_unique_key {
        warn!(form_id = %form_id, "Form has no unique key field; its submissions are not indexed");
    }
    for duplicate in &plan.duplicates {
        warn!(
            form_id = %duplicate.form_id,
            kept = %duplicate.kept_submission_id,
            skipped = %duplicate.duplicate_submission_id,
            "Duplicate key skipped"
        );
    }

    let removed = sqlx::query("DELETE FROM submission_unique_keys")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    insert_key_rows(&mut *tx, &plan.rows).await?;

    {
        let index = PgUniqueKeyIndex::new(&mut *tx);
        for (form_id, schema) in schemas.iter().filter(|(_, schema)| schema.has_unique_key()) {
            let rows = index.entries_for_form(*form_id).await?;
            info!(
                form_id = %form_id,
                key_name = %key_name_for(schema).unwrap_or_default(),
                rows = rows.len(),
                "Form keys indexed"
            );
        }
    }

    info!(
        removed,
        inserted = plan.rows.len(),
        forms_scanned = plan.forms_scanned,
        forms_without_unique_key = plan.forms_without_unique_key.len(),
        skipped_incomplete = plan.skipped_incomplete,
        skipped_duplicates = plan.skipped_duplicates,
        "Rebuild summary"
    );

    if args.dry_run {
        tx.rollback().await?;
        info!("Dry run complete, no changes committed");
    } else {
        tx.commit().await?;
        info!("Unique key index rebuilt");
    }

    db.close().await;
    Ok(())
}

/// Mark the best candidate field of a legacy form as its unique key
async fn assign_unique_field(
    conn: &mut PgConnection,
    form: &Form,
    schema: &mut FormSchema,
    submissions: &[StoredSubmission],
) -> anyhow::Result<()> {
    let payloads: Vec<Payload> = submissions
        .iter()
        .filter(|s| s.form_id == form.id)
        .map(|s| s.payload.clone())
        .collect();

    let Some(suggestion) = suggest_unique_field(schema, &payloads) else {
        warn!(form_id = %form.id, "No candidate unique key field found");
        return Ok(());
    };

    let mut schema_json = form.schema_json.clone();
    if !mark_unique_field(&mut schema_json, &suggestion.field_name) {
        return Ok(());
    }

    sqlx::query("UPDATE forms SET schema_json = $2, updated_at = NOW() WHERE id = $1")
        .bind(form.id)
        .bind(&schema_json)
        .execute(&mut *conn)
        .await?;
    *schema = FormSchema::from_value(&schema_json);

    info!(
        form_id = %form.id,
        field = %suggestion.field_name,
        non_empty = suggestion.non_empty_count,
        duplicates = suggestion.duplicate_count,
        "Unique key field assigned"
    );
    Ok(())
}
