//! The build controller: decides when the next build starts and runs it.
//!
//! The controller is a store subscriber. On every state change it reads a
//! snapshot under the read lock, decides whether a build can start, and if
//! so dispatches a build-started action and runs the build on a detached
//! task that reports back with a build-complete action.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::build_state_set::{build_state_set, build_targets};
use super::log_writer::BuildLogActionWriter;
use super::types::{BuildAndDeployer, BuildContext, BuildControllerConfig, BuildError};
use crate::buildcontrol::{BuildCompleteAction, BuildStartedAction, TargetSelector};
use crate::consts::{BUILD_SPAN_PREFIX, SUMMARY_DELIMITER};
use crate::logger::{FIELD_NAME_BUILD_EVENT, Fields, Logger};
use crate::logstore::SpanId;
use crate::model::{BuildReason, ManifestName, TargetSpec};
use crate::store::{BuildResultSet, BuildStateSet, Dispatch, Store, Subscriber};
use crate::util::path::format_file_change_list;

/// Everything needed to run one admitted build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildEntry {
  pub name: ManifestName,
  pub targets: Vec<TargetSpec>,
  pub build_state_set: BuildStateSet,
  /// Config files that caused the change, then changed source files.
  pub files_changed: Vec<String>,
  pub build_reason: BuildReason,
  pub first_build: bool,
  pub span_id: SpanId,
}

pub fn span_id_for_build_log(build_count: u64) -> SpanId {
  SpanId(format!("{BUILD_SPAN_PREFIX}:{build_count}"))
}

/// Starts builds as engine state allows.
///
/// Concurrency is bounded by the store's build slots; the controller itself
/// only checks that a slot is free at admission time. Running builds cannot
/// be cancelled.
pub struct BuildController<B, T> {
  builder: Arc<B>,
  selector: T,
  config: BuildControllerConfig,
  /// Builds this controller has admitted. Must match the store's
  /// `started_build_count` before another build may be admitted.
  builds_started_count: u64,
  disabled_for_testing: bool,
}

impl<B, T> BuildController<B, T>
where
  B: BuildAndDeployer,
  T: TargetSelector,
{
  pub fn new(builder: B, selector: T) -> Self {
    Self {
      builder: Arc::new(builder),
      selector,
      config: BuildControllerConfig::default(),
      builds_started_count: 0,
      disabled_for_testing: false,
    }
  }

  pub fn with_config(mut self, config: BuildControllerConfig) -> Self {
    self.config = config;
    self
  }

  pub fn disable_for_testing(&mut self) {
    self.disabled_for_testing = true;
  }

  pub fn builds_started_count(&self) -> u64 {
    self.builds_started_count
  }

  /// Decide whether a build can start now and describe it.
  ///
  /// Declines while the store has not yet applied the previous build-started
  /// action, when no build slot is free, or when the selector has nothing
  /// ready.
  pub fn needs_build<S: Store>(&mut self, store: &S) -> Option<BuildEntry> {
    let started = &mut self.builds_started_count;
    let selector = &self.selector;

    store.read_state(|state| {
      // Don't start the next build until the previous start has been
      // recorded, or we could start the same build twice.
      if *started != state.started_build_count {
        return None;
      }

      if state.available_build_slots() < 1 {
        return None;
      }

      let mt = selector.next_target_to_build(state)?;

      *started += 1;
      let ms = &mt.state;
      let manifest = &mt.manifest;
      let first_build = !ms.started_first_build();
      let build_reason = mt.next_build_reason();
      let targets = build_targets(manifest);
      let build_state_set = build_state_set(manifest, &targets, ms);

      let mut files_changed = ms.config_files_that_caused_change.clone();
      files_changed.extend(build_state_set.files_changed());

      Some(BuildEntry {
        name: manifest.name.clone(),
        targets,
        build_state_set,
        files_changed,
        build_reason,
        first_build,
        span_id: span_id_for_build_log(*started),
      })
    })
  }
}

impl<S, B, T> Subscriber<S> for BuildController<B, T>
where
  S: Store,
  B: BuildAndDeployer,
  T: TargetSelector,
{
  fn on_change(&mut self, store: &Arc<S>) {
    if self.disabled_for_testing {
      return;
    }

    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
      warn!("no async runtime available; not starting builds");
      return;
    };

    let Some(entry) = self.needs_build(store.as_ref()) else {
      return;
    };

    info!(
      manifest = %entry.name,
      span_id = %entry.span_id,
      reason = %entry.build_reason,
      "starting build"
    );

    // Must land before any of this build's log lines.
    store.dispatch(
      BuildStartedAction {
        manifest_name: entry.name.clone(),
        start_time: Utc::now(),
        files_changed: entry.files_changed.clone(),
        reason: entry.build_reason.clone(),
        span_id: entry.span_id.clone(),
      }
      .into(),
    );

    runtime.spawn(run_build(
      self.builder.clone(),
      store.clone(),
      entry,
      self.config.clone(),
    ));
  }
}

async fn run_build<S, B>(builder: Arc<B>, store: Arc<S>, entry: BuildEntry, config: BuildControllerConfig)
where
  S: Store,
  B: BuildAndDeployer,
{
  // Logs go to both the store and the normal log stream.
  let dispatcher: Arc<dyn Dispatch> = store.clone();
  let writer = BuildLogActionWriter::new(dispatcher.clone(), entry.name.clone(), entry.span_id.clone());
  let ctx = BuildContext {
    manifest_name: entry.name.clone(),
    span_id: entry.span_id.clone(),
    logger: Logger::new().with_handler(Arc::new(writer)),
    store: dispatcher,
  };

  log_build_entry(&ctx.logger, &entry, &config);

  let BuildEntry {
    name,
    span_id,
    targets,
    build_state_set,
    ..
  } = entry;

  let task = tokio::spawn(async move { build_and_deploy(builder.as_ref(), &ctx, &targets, &build_state_set).await });
  let result = match task.await {
    Ok(result) => result,
    Err(e) => {
      error!(manifest = %name, span_id = %span_id, error = %e, "build task panicked");
      Err(BuildError::Panicked { message: e.to_string() })
    }
  };

  match &result {
    Ok(results) => info!(manifest = %name, span_id = %span_id, targets = results.len(), "build succeeded"),
    Err(e) => warn!(manifest = %name, span_id = %span_id, error = %e, "build failed"),
  }

  store.dispatch(BuildCompleteAction::new(name, span_id, result).into());
}

/// Validate every target, then hand them to the build engine.
async fn build_and_deploy<B>(
  builder: &B,
  ctx: &BuildContext,
  targets: &[TargetSpec],
  state_set: &BuildStateSet,
) -> Result<BuildResultSet, BuildError>
where
  B: BuildAndDeployer + ?Sized,
{
  for target in targets {
    if let Err(e) = target.validate() {
      debug!(target = %target.id(), error = %e, "target failed validation");
      return Err(e.into());
    }
  }
  builder.build_and_deploy(ctx, targets, state_set).await
}

fn log_build_entry(logger: &Logger, entry: &BuildEntry, config: &BuildControllerConfig) {
  let cwd = std::env::current_dir().ok();
  let logger = logger.with_fields(Fields::from([(FIELD_NAME_BUILD_EVENT.to_string(), "0".to_string())]));
  logger.info(format_build_summary(entry, cwd.as_deref(), config.max_changed_files_to_print));
}

/// The one-line summary printed before a build runs.
pub fn format_build_summary(entry: &BuildEntry, base: Option<&Path>, max_files: usize) -> String {
  let name = &entry.name;
  if entry.first_build {
    return format!("Initial Build {SUMMARY_DELIMITER} {name}");
  }

  let changed = &entry.files_changed;
  if changed.is_empty() {
    return format!("{} {SUMMARY_DELIMITER} {name}", entry.build_reason);
  }

  let noun = if changed.len() > 1 { "Files" } else { "File" };
  format!(
    "{} {noun} Changed: {} {SUMMARY_DELIMITER} {name}",
    changed.len(),
    format_file_change_list(changed, base, max_files)
  )
}
