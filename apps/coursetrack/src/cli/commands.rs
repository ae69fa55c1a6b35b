//! # CLI Command Implementations

use super::SnapshotFormat;
use coursetrack::api::{self, AppState, COMPLETION_DISABLED_NOTICE};
use coursetrack::config::{Backend, StorageConfig, TrackerConfig};
use coursetrack::dates;
use coursetrack_core::{
    Catalog, CatalogSnapshot, CurrentUser, Dashboard, DashboardSummary, DashboardView, Metric,
    ReportKind, Store, TrackerError, UserId, primitives::MAGIC_BYTES, report::ReportColumn,
    snapshot_from_bytes, snapshot_to_bytes,
};
use std::path::{Path, PathBuf};

// =============================================================================
// OUTPUT MODE
// =============================================================================

/// How results are printed.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub verbose: bool,
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum snapshot file size accepted by `import` (256 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 256 * 1024 * 1024;

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), TrackerError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TrackerError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(TrackerError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, TrackerError> {
    let canonical = path.canonicalize().map_err(|e| {
        TrackerError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TrackerError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    Ok(canonical)
}

/// Resolve an output path against an existing parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, TrackerError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        TrackerError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(TrackerError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }
    let filename = path
        .file_name()
        .ok_or_else(|| TrackerError::Io("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

pub async fn cmd_server(config: &TrackerConfig) -> Result<(), TrackerError> {
    let store = open_store(&config.storage)?;

    println!("coursetrack server starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", config.server.host);
    println!("  Port:       {}", config.server.port);
    println!("  Backend:    {}", config.storage.backend);
    println!("  Database:   {}", config.storage.database.display());
    println!("  Completion: {}", on_off(config.completion_tracking_enabled));
    println!();
    println!("Endpoints:");
    println!("  GET  /health");
    println!("  GET  /status");
    println!("  GET  /users/{{user_id}}/dashboard");
    println!("  GET  /users/{{user_id}}/reports/enrolled");
    println!("  GET  /users/{{user_id}}/reports/in-progress");
    println!("  POST /catalog/import");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    if config.storage.backend == Backend::File {
        tracing::warn!("File backend: catalogs imported over HTTP are kept in memory only");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    api::run_server(&addr, AppState::new(store, config.flags())).await
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

// =============================================================================
// INIT COMMAND
// =============================================================================

pub fn cmd_init(config: &TrackerConfig, force: bool) -> Result<(), TrackerError> {
    let db_path = &config.storage.database;
    if db_path.exists() {
        if !force {
            return Err(TrackerError::Io(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| TrackerError::Io(format!("Remove existing database: {}", e)))?;
    }

    let store = open_store(&config.storage)?;
    save_store(&store, &config.storage)?;
    println!(
        "Initialized new {} database at {}",
        config.storage.backend,
        db_path.display()
    );
    Ok(())
}

// =============================================================================
// IMPORT / EXPORT COMMANDS
// =============================================================================

pub fn cmd_import(config: &TrackerConfig, output: Output, file: &Path) -> Result<(), TrackerError> {
    let validated = validate_file_path(file)?;
    validate_file_size(&validated, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated)
        .map_err(|e| TrackerError::Io(format!("Read {}: {}", validated.display(), e)))?;
    let snapshot = decode_snapshot(&data)?;
    let records = snapshot.record_count();

    let mut store = open_store(&config.storage)?;
    store.import(snapshot)?;
    save_store(&store, &config.storage)?;
    let stats = store.stats()?;

    tracing::info!(records, file = %validated.display(), "Catalog imported");

    if output.json {
        print_json(&serde_json::json!({
            "success": true,
            "records": records,
            "stats": stats,
        }));
        return Ok(());
    }

    println!("Imported {} records from {}", records, validated.display());
    println!(
        "Store now holds {} courses, {} enrollments, {} ledger rows",
        stats.courses, stats.enrollments, stats.ledger_rows
    );
    Ok(())
}

pub fn cmd_export(
    config: &TrackerConfig,
    output: &Path,
    format: SnapshotFormat,
) -> Result<(), TrackerError> {
    let target = validate_output_path(output)?;
    let store = open_store(&config.storage)?;
    let snapshot = store.to_snapshot()?;

    let data = match format {
        SnapshotFormat::Json => serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| TrackerError::Serialization(e.to_string()))?,
        SnapshotFormat::Binary => snapshot_to_bytes(&snapshot)?,
    };
    std::fs::write(&target, &data)
        .map_err(|e| TrackerError::Io(format!("Write {}: {}", target.display(), e)))?;

    println!(
        "Exported {} records to {} ({} bytes)",
        snapshot.record_count(),
        target.display(),
        data.len()
    );
    Ok(())
}

/// Binary snapshots start with the magic bytes; anything else is read as JSON.
fn decode_snapshot(data: &[u8]) -> Result<CatalogSnapshot, TrackerError> {
    if data.starts_with(MAGIC_BYTES) {
        return snapshot_from_bytes(data);
    }
    serde_json::from_slice(data)
        .map_err(|e| TrackerError::Serialization(format!("Snapshot JSON: {}", e)))
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

pub fn cmd_status(config: &TrackerConfig, output: Output) -> Result<(), TrackerError> {
    let store = open_store(&config.storage)?;
    let stats = store.stats()?;

    if output.json {
        print_json(&serde_json::json!({
            "database": config.storage.database.to_string_lossy(),
            "backend": config.storage.backend,
            "completion_tracking_enabled": config.completion_tracking_enabled,
            "stats": stats,
        }));
        return Ok(());
    }

    println!("coursetrack Status");
    println!("==================");
    println!("Database:   {}", config.storage.database.display());
    println!("Backend:    {}", config.storage.backend);
    println!("Completion: {}", on_off(config.completion_tracking_enabled));
    println!();
    println!("Categories:         {}", stats.categories);
    println!("Courses:            {}", stats.courses);
    println!("Enrollments:        {}", stats.enrollments);
    println!("Criteria:           {}", stats.criteria);
    println!("Ledger rows:        {}", stats.ledger_rows);
    println!("Completion records: {}", stats.completion_records);
    Ok(())
}

// =============================================================================
// DASHBOARD COMMAND
// =============================================================================

pub fn cmd_dashboard(
    config: &TrackerConfig,
    output: Output,
    user: UserId,
) -> Result<(), TrackerError> {
    let store = open_store(&config.storage)?;
    let dashboard = Dashboard::new(&store, CurrentUser::new(user), config.flags());
    let view = dashboard.view()?;

    if output.json {
        print_json(&serde_json::json!({
            "user_id": user.0,
            "dashboard": view,
        }));
        return Ok(());
    }

    let summary = match view {
        DashboardView::Disabled => {
            println!("Completion tracking is disabled ({})", COMPLETION_DISABLED_NOTICE);
            return Ok(());
        }
        DashboardView::Summary(summary) => summary,
    };

    print_summary(&summary);

    if !output.verbose {
        return Ok(());
    }
    let undefined = dashboard
        .classification()?
        .map(|result| result.criteria_undefined_courses.as_slice())
        .unwrap_or_default();
    if !undefined.is_empty() {
        let ids: Vec<String> = undefined.iter().map(|id| id.0.to_string()).collect();
        println!();
        println!("Courses without criteria: {}", ids.join(", "));
    }
    Ok(())
}

fn print_summary(summary: &DashboardSummary) {
    println!("Course Dashboard ({})", summary.user);
    println!("==========================");
    print_metric("Enrolled", &summary.enrolled);
    print_metric("Completed", &summary.completed);
    print_metric("In progress", &summary.in_progress);
    print_metric("Criteria undefined", &summary.criteria_undefined);

    if !summary.consistent {
        println!();
        println!(
            "Note: the completion ledger holds rows outside the enrolled courses, \
             so the in-progress count is negative."
        );
    }
}

fn print_metric<T: std::fmt::Display>(label: &str, metric: &Metric<T>) {
    let link = match metric.drill_down {
        Some(ReportKind::Enrolled) => "  -> enrolled",
        Some(ReportKind::Progress) => "  -> in-progress",
        None => "",
    };
    println!("{:<20}{:>6}{}", format!("{}:", label), metric.value, link);
}

// =============================================================================
// REPORT COMMANDS
// =============================================================================

pub fn cmd_enrolled(config: &TrackerConfig, output: Output, user: UserId) -> Result<(), TrackerError> {
    let store = open_store(&config.storage)?;
    let dashboard = Dashboard::new(&store, CurrentUser::new(user), config.flags());

    let Some(report) = dashboard.enrolled_report()? else {
        return report_disabled(output, user);
    };

    if output.json {
        print_json(&serde_json::json!({
            "user_id": user.0,
            "rows": report.rows,
        }));
        return Ok(());
    }

    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|row| {
            vec![
                row.sequence_number.to_string(),
                row.category_name.clone(),
                row.course.label.clone(),
            ]
        })
        .collect();
    print_table(&coursetrack_core::EnrolledCoursesReport::COLUMNS, &rows);
    Ok(())
}

pub fn cmd_in_progress(
    config: &TrackerConfig,
    output: Output,
    user: UserId,
) -> Result<(), TrackerError> {
    let store = open_store(&config.storage)?;
    let dashboard = Dashboard::new(&store, CurrentUser::new(user), config.flags());

    let Some(report) = dashboard.in_progress_report()? else {
        return report_disabled(output, user);
    };

    if output.json {
        let rows: Vec<serde_json::Value> = report
            .rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "sequence_number": row.sequence_number,
                    "category_name": row.category_name,
                    "course": row.course,
                    "time_enrolled": row.time_enrolled,
                    "enrolled_at": dates::rfc2822(row.time_enrolled),
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "user_id": user.0,
            "rows": rows,
        }));
        return Ok(());
    }

    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|row| {
            vec![
                row.sequence_number.to_string(),
                row.category_name.clone(),
                row.course.label.clone(),
                dates::rfc2822(row.time_enrolled).unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    print_table(&coursetrack_core::InProgressCoursesReport::COLUMNS, &rows);
    Ok(())
}

fn report_disabled(output: Output, user: UserId) -> Result<(), TrackerError> {
    if output.json {
        print_json(&serde_json::json!({
            "user_id": user.0,
            "enabled": false,
            "notice": COMPLETION_DISABLED_NOTICE,
        }));
    } else {
        println!("Completion tracking is disabled ({})", COMPLETION_DISABLED_NOTICE);
    }
    Ok(())
}

/// English heading for a column's localization key.
fn heading(column: &ReportColumn) -> &'static str {
    match column.heading_key {
        "s_no" => "S.No",
        "module" => "Module",
        "course_name" => "Course Name",
        "timeenrolled" => "Time Enrolled",
        other => other,
    }
}

fn print_table(columns: &[ReportColumn], rows: &[Vec<String>]) {
    if rows.is_empty() {
        println!("No courses.");
        return;
    }

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(heading(column).len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", heading(column), width = *width))
        .collect();
    println!("{}", header.join("  "));
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    println!("{}", rule.join("  "));

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

// =============================================================================
// COMPACT COMMAND
// =============================================================================

pub fn cmd_compact(config: &TrackerConfig) -> Result<(), TrackerError> {
    let mut store = open_store(&config.storage)?;
    match &mut store {
        Store::Persistent(redb) => {
            redb.compact()?;
            println!("Compacted {}", config.storage.database.display());
            Ok(())
        }
        Store::InMemory(_) => Err(TrackerError::Io(
            "Compaction applies to the redb backend only".to_string(),
        )),
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured store. A missing snapshot file yields an empty store.
pub fn open_store(storage: &StorageConfig) -> Result<Store, TrackerError> {
    match storage.backend {
        Backend::Redb => Store::with_redb(&storage.database),
        Backend::File => {
            if !storage.database.exists() {
                return Ok(Store::new());
            }
            validate_file_size(&storage.database, MAX_IMPORT_FILE_SIZE)?;
            let data = std::fs::read(&storage.database)
                .map_err(|e| TrackerError::Io(format!("Read db: {}", e)))?;
            let snapshot = snapshot_from_bytes(&data)?;
            Ok(Store::with_catalog(Catalog::from_snapshot(snapshot)?))
        }
    }
}

/// Persist an in-memory store as a binary snapshot. Redb stores are already
/// durable.
pub fn save_store(store: &Store, storage: &StorageConfig) -> Result<(), TrackerError> {
    if store.is_persistent() {
        return Ok(());
    }
    let data = snapshot_to_bytes(&store.to_snapshot()?)?;
    std::fs::write(&storage.database, &data)
        .map_err(|e| TrackerError::Io(format!("Write db: {}", e)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use coursetrack_core::{Category, CategoryId, Course, CourseId, Enrollment, Timestamp};

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            categories: vec![Category {
                id: CategoryId(1),
                name: "Physics".to_string(),
            }],
            courses: vec![Course::new(CourseId(1), CategoryId(1), "Optics")],
            enrollments: vec![Enrollment {
                user: UserId(5),
                course: CourseId(1),
                time_enrolled: Timestamp(100),
            }],
            ..CatalogSnapshot::default()
        }
    }

    fn file_storage(dir: &Path) -> StorageConfig {
        StorageConfig {
            database: dir.join("catalog.bin"),
            backend: Backend::File,
        }
    }

    #[test]
    fn file_backend_roundtrips_through_disk() {
        let temp = tempfile::tempdir().expect("temp dir");
        let storage = file_storage(temp.path());

        let mut store = open_store(&storage).expect("open");
        assert!(!store.is_persistent());
        store.import(snapshot()).expect("import");
        save_store(&store, &storage).expect("save");

        let reopened = open_store(&storage).expect("reopen");
        assert_eq!(reopened.stats().expect("stats").enrollments, 1);
    }

    #[test]
    fn file_backend_reopens_after_criterion_moves() {
        use coursetrack_core::{CompletionCriterion, CourseDataGateway, CriterionId};

        let temp = tempfile::tempdir().expect("temp dir");
        let storage = file_storage(temp.path());
        let with_criterion = |course: u64| {
            let mut snap = snapshot();
            snap.courses
                .push(Course::new(CourseId(2), CategoryId(1), "Acoustics"));
            snap.criteria.push(CompletionCriterion {
                id: CriterionId(1),
                course: CourseId(course),
            });
            snap
        };

        for course in [1, 2] {
            let mut store = open_store(&storage).expect("open");
            store.import(with_criterion(course)).expect("import");
            save_store(&store, &storage).expect("save");
        }

        let reopened = open_store(&storage).expect("reopen");
        assert_eq!(reopened.stats().expect("stats").criteria, 1);
        assert!(
            reopened
                .has_completion_criteria(CourseId(2))
                .expect("lookup")
        );
    }

    #[test]
    fn redb_backend_persists_without_save() {
        let temp = tempfile::tempdir().expect("temp dir");
        let storage = StorageConfig {
            database: temp.path().join("catalog.redb"),
            backend: Backend::Redb,
        };

        {
            let mut store = open_store(&storage).expect("open");
            store.import(snapshot()).expect("import");
        }
        let reopened = open_store(&storage).expect("reopen");
        assert_eq!(reopened.stats().expect("stats").courses, 1);
    }

    #[test]
    fn snapshot_decoding_detects_format() {
        let binary = snapshot_to_bytes(&snapshot()).expect("encode");
        assert_eq!(decode_snapshot(&binary).expect("binary"), snapshot());

        let json = serde_json::to_vec(&snapshot()).expect("json");
        assert_eq!(decode_snapshot(&json).expect("json"), snapshot());

        assert!(matches!(
            decode_snapshot(b"not a snapshot"),
            Err(TrackerError::Serialization(_))
        ));
    }

    #[test]
    fn output_path_requires_existing_parent() {
        let temp = tempfile::tempdir().expect("temp dir");
        assert!(validate_output_path(&temp.path().join("out.json")).is_ok());
        assert!(validate_output_path(&temp.path().join("missing/out.json")).is_err());
    }

    #[test]
    fn headings_cover_report_columns() {
        for column in coursetrack_core::InProgressCoursesReport::COLUMNS.iter() {
            assert_ne!(heading(column), column.heading_key);
        }
    }
}
