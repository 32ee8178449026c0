//! Pipeline orchestration - wires together all try-on stages.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::mapper::ResultMapper;
use crate::poll::StatusPoller;
use crate::provider::{GenerationProvider, GenerationProviderFactory};
use crate::session::{SessionStore, SessionUpdate};
use crate::types::TryOnResult;
use crate::vision::{VisionProvider, VisionProviderFactory};

use super::detect::SubjectDetector;
use super::input::{ImageInput, Normalizer};
use super::prepare::GarmentPreparer;
use super::submit::{JobSubmitter, Submission};

/// Options for one `generate` invocation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Poll until a terminal status (otherwise return right after submission)
    pub wait_for_completion: bool,
    /// Skip subject detection and cropping of the garment
    pub skip_crop: bool,
    /// Override the configured polling budget
    pub poll_timeout_ms: Option<u64>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            wait_for_completion: true,
            skip_crop: false,
            poll_timeout_ms: None,
        }
    }
}

struct LivePipeline {
    submitter: JobSubmitter,
    poller: StatusPoller,
}

/// Resolved once at construction; the two paths share nothing.
enum Mode {
    Live(Box<LivePipeline>),
    Demo,
}

/// The try-on pipeline: normalize, prepare, submit, poll, map.
///
/// Each call is independent; the pipeline holds no per-invocation state and
/// can be shared across tasks.
pub struct TryOnPipeline {
    mode: Mode,
    default_budget: Duration,
}

impl TryOnPipeline {
    /// Build from configuration.
    ///
    /// Demo mode is chosen when the flag is set or no provider key resolves.
    /// A vision backend that cannot be built only disables cropping.
    pub fn new(config: &Config) -> PipelineResult<Self> {
        if config.demo_mode() {
            tracing::info!("Try-on demo mode active, no provider calls will be made");
            return Ok(Self::demo(config));
        }

        let provider = GenerationProviderFactory::create(&config.provider)?;
        let vision: Option<Arc<dyn VisionProvider>> = if config.vision.enabled {
            match VisionProviderFactory::create(&config.vision) {
                Ok(provider) => Some(Arc::from(provider)),
                Err(e) => {
                    tracing::warn!("Subject detection disabled: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::with_providers(config, provider, vision))
    }

    /// Build with explicit provider implementations.
    ///
    /// Only the demo flag is consulted here; credentials are the injected
    /// provider's concern.
    pub fn with_providers(
        config: &Config,
        provider: Arc<dyn GenerationProvider>,
        vision: Option<Arc<dyn VisionProvider>>,
    ) -> Self {
        if config.demo.enabled {
            return Self::demo(config);
        }

        let detector = vision.map_or_else(SubjectDetector::disabled, SubjectDetector::new);
        let preparer = GarmentPreparer::new(config.compression.clone(), config.limits.clone(), detector);
        let submitter = JobSubmitter::new(Normalizer::new(config.limits.clone()), preparer, provider.clone());
        let poller = StatusPoller::new(provider, config.polling.clone());

        Self {
            mode: Mode::Live(Box::new(LivePipeline { submitter, poller })),
            default_budget: Duration::from_millis(config.polling.timeout_ms),
        }
    }

    fn demo(config: &Config) -> Self {
        Self {
            mode: Mode::Demo,
            default_budget: Duration::from_millis(config.polling.timeout_ms),
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self.mode, Mode::Demo)
    }

    /// Run one try-on. Never fails: errors become a failed [`TryOnResult`].
    pub async fn generate(
        &self,
        customer: &ImageInput,
        garment: &ImageInput,
        product_label: &str,
        options: &GenerateOptions,
    ) -> TryOnResult {
        let live = match &self.mode {
            Mode::Demo => return ResultMapper::demo(customer, product_label),
            Mode::Live(live) => live,
        };

        let start = Instant::now();
        tracing::info!("Generating try-on for {product_label:?}");

        let submission = match live
            .submitter
            .submit(customer, garment, options.skip_crop)
            .await
        {
            Ok(submission) => submission,
            Err(e) => return Self::fail(&e),
        };

        let result = match submission {
            Submission::Inline(status) => ResultMapper::map(&status, None),
            Submission::Job(job) if !options.wait_for_completion => ResultMapper::pending(&job),
            Submission::Job(job) => {
                let outcome = live
                    .poller
                    .poll(&job.status_url, self.budget(options.poll_timeout_ms))
                    .await;
                ResultMapper::map(&outcome.response, Some(&job))
            }
        };

        tracing::info!(
            "Try-on finished in {:?}: success={} pending={}",
            start.elapsed(),
            result.success,
            result.is_pending()
        );
        result
    }

    /// Poll an existing job by status URL.
    pub async fn poll(&self, status_url: &str, poll_timeout_ms: Option<u64>) -> TryOnResult {
        match &self.mode {
            Mode::Demo => TryOnResult::failure("Demo mode: there are no provider jobs to poll"),
            Mode::Live(live) => {
                let outcome = live.poller.poll(status_url, self.budget(poll_timeout_ms)).await;
                let mut result = ResultMapper::map(&outcome.response, None);
                if result.is_pending() {
                    result.status_url = Some(status_url.to_string());
                }
                result
            }
        }
    }

    /// Run `generate` and report the outcome to the session store exactly once.
    ///
    /// A store failure is logged; the try-on result is returned regardless.
    pub async fn generate_for_session(
        &self,
        session_id: &str,
        store: &dyn SessionStore,
        customer: &ImageInput,
        garment: &ImageInput,
        product_label: &str,
        options: &GenerateOptions,
    ) -> TryOnResult {
        let result = self.generate(customer, garment, product_label, options).await;
        let update = SessionUpdate::from_result(&result);
        if let Err(e) = store.update(session_id, update).await {
            tracing::warn!("Failed to update session {session_id}: {e}");
        }
        result
    }

    fn budget(&self, override_ms: Option<u64>) -> Duration {
        override_ms.map_or(self.default_budget, Duration::from_millis)
    }

    fn fail(error: &PipelineError) -> TryOnResult {
        match error {
            PipelineError::ProviderContract { provider, payload, .. } => {
                tracing::error!("{provider} contract violation, payload: {payload}");
            }
            other => tracing::error!("Try-on failed: {other}"),
        }
        ResultMapper::from_error(error)
    }
}
