//! In-memory executor over a slice of documents.
//!
//! Each operation emits one `dev6!` benchmark line so tests and profiling
//! runs can observe result counts and timings without a global logger.

use std::time::Instant;

use crate::config::QueryConfig;
use crate::cursor::{BoxedIter, VecIter, limit, skip};
use crate::document::{Document, ID_FIELD};
use crate::errors::DbError;
use crate::update::{UpdateContext, UpdateSpec, apply_update, build_upsert_document};
use crate::utils::num::{u128_to_u64_saturating, usize_to_u64};

use super::eval::matches;
use super::filter::FilterTree;
use super::sort::{parse_sort, sort_documents};
use super::types::{DeleteReport, FindParams, UpdateParams, UpdateReport};

fn elapsed_ms(start: Instant) -> u64 {
    u128_to_u64_saturating(start.elapsed().as_millis())
}

fn non_negative(field: &str, n: i64) -> Result<i64, DbError> {
    if n < 0 {
        return Err(DbError::bad_value(field, format!("{field} value must be non-negative, but received: {n}")));
    }
    Ok(n)
}

/// Filters, sorts and paginates `docs`.
///
/// The returned sequence is already skip/limit-wrapped and can be handed to
/// [`crate::cursor::CursorRegistry::first_batch`].
///
/// # Errors
/// Filter and sort validation errors; `BadValue` for negative skip or limit.
pub fn find(docs: &[Document], params: &FindParams, cfg: &QueryConfig) -> Result<BoxedIter, DbError> {
    let start = Instant::now();
    let n_skip = non_negative("skip", params.skip)?;
    let n_limit = non_negative("limit", params.limit)?;
    let tree = FilterTree::compile_with_depth(&params.filter, cfg.max_path_depth)?;
    let keys = match &params.sort {
        Some(spec) => parse_sort(spec, cfg.max_sort_keys, cfg.max_path_depth)?,
        None => Vec::new(),
    };
    let mut hits: Vec<Document> = docs.iter().filter(|d| matches(d, &tree)).cloned().collect();
    sort_documents(&mut hits, &keys);
    let matched = hits.len();
    let iter = limit(skip(VecIter::boxed(hits), n_skip), n_limit);
    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"find\",\"duration_ms\":{},\"matched\":{},\"sort_keys\":{},\"skip\":{},\"limit\":{}}}",
        elapsed_ms(start),
        usize_to_u64(matched),
        usize_to_u64(keys.len()),
        n_skip,
        n_limit
    );
    Ok(iter)
}

/// Number of documents matching `filter`.
///
/// # Errors
/// Filter validation errors.
pub fn count(docs: &[Document], filter: &Document, cfg: &QueryConfig) -> Result<u64, DbError> {
    let start = Instant::now();
    let tree = FilterTree::compile_with_depth(filter, cfg.max_path_depth)?;
    let n = usize_to_u64(docs.iter().filter(|d| matches(d, &tree)).count());
    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"count\",\"duration_ms\":{},\"result_count\":{}}}",
        elapsed_ms(start),
        n
    );
    Ok(n)
}

/// Applies an update to the matching documents, or upserts.
///
/// All matched documents are updated or none are: every new version is
/// computed before any is written back. Paths are bounded by
/// `cfg.max_path_depth`, which overrides the depth carried by `ctx`.
///
/// # Errors
/// Filter, update-parse and operator errors.
pub fn update(
    docs: &mut Vec<Document>,
    params: &UpdateParams,
    ctx: &UpdateContext,
    cfg: &QueryConfig,
) -> Result<UpdateReport, DbError> {
    let start = Instant::now();
    let ctx = &ctx.with_path_depth(cfg.max_path_depth);
    let tree = FilterTree::compile_with_depth(&params.filter, cfg.max_path_depth)?;
    let spec = UpdateSpec::parse_with_depth(&params.update, cfg.max_path_depth)?;
    if params.multi && spec.is_replacement() && !params.update.is_empty() {
        return Err(DbError::bad_value("multi", "multi update is not supported for replacement-style update"));
    }

    let mut staged = Vec::new();
    for (idx, doc) in docs.iter().enumerate() {
        if !matches(doc, &tree) {
            continue;
        }
        staged.push((idx, apply_update(doc, &spec, ctx)?));
        if !params.multi {
            break;
        }
    }

    let mut report = UpdateReport { matched: usize_to_u64(staged.len()), ..UpdateReport::default() };
    for (idx, outcome) in staged {
        if outcome.changed {
            report.modified += 1;
            docs[idx] = outcome.doc;
        }
    }

    if report.matched == 0 && params.upsert {
        let inserted = build_upsert_document(&params.filter, &spec, ctx)?;
        report.upserted_id = inserted.get(ID_FIELD).cloned();
        docs.push(inserted);
    }

    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"update\",\"duration_ms\":{},\"matched\":{},\"modified\":{},\"upserted\":{}}}",
        elapsed_ms(start),
        report.matched,
        report.modified,
        report.upserted_id.is_some()
    );
    Ok(report)
}

/// Removes matching documents, at most one when `limit_one` is set.
///
/// # Errors
/// Filter validation errors.
pub fn delete(
    docs: &mut Vec<Document>,
    filter: &Document,
    limit_one: bool,
    cfg: &QueryConfig,
) -> Result<DeleteReport, DbError> {
    let start = Instant::now();
    let tree = FilterTree::compile_with_depth(filter, cfg.max_path_depth)?;
    let mut deleted = 0u64;
    docs.retain(|d| {
        if (limit_one && deleted > 0) || !matches(d, &tree) {
            return true;
        }
        deleted += 1;
        false
    });
    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"delete\",\"duration_ms\":{},\"deleted\":{},\"limit_one\":{}}}",
        elapsed_ms(start),
        deleted,
        limit_one
    );
    Ok(DeleteReport { deleted })
}
