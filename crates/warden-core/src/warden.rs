//! The Warden orchestrator.
//!
//! Wires the four host lifecycle phases to the verdict cache and the
//! enforcement policy. The host calls one method per phase; each method
//! returns what the host contract expects (nothing, a context injection, a
//! tool decision or an outbound modification).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use warden_cache::{spawn_periodic, Fingerprint, InMemoryVerdictCache, VerdictStore};
use warden_policy::{build_block_message, EnforcementPolicy, OutboundDecision};
use warden_verdict::{ThreatCategory, Verdict};

use crate::config::WardenConfig;
use crate::events::{
    AgentStartEvent, ContextInjection, InboundEvent, OutboundEvent, OutboundModification,
    SessionScoped, ToolCallDecision, ToolCallEvent,
};
use crate::modes::{Feature, ResolvedModes};
use crate::rate_limit::{RateLimitedScanner, RateLimiter};
use crate::scanner::{AppMetadata, ScanError, ScanRequest, Scanner};
use crate::Result;

/// The cross-phase enforcement engine.
///
/// # Phases
///
/// | Phase | Method | Feature | Can |
/// |-------|--------|---------|-----|
/// | Inbound receipt | [`on_message_received`](Self::on_message_received) | audit | cache a verdict |
/// | Pre-processing | [`before_agent_start`](Self::before_agent_start) | context injection | prepend a warning |
/// | Pre-tool | [`before_tool_call`](Self::before_tool_call) | tool gating | block the call |
/// | Pre-send | [`message_sending`](Self::message_sending) | outbound | mask or replace |
///
/// A phase only runs when its feature resolved to deterministic.
///
/// # Race
///
/// The inbound scan is spawned and not awaited, so it may finish after
/// pre-processing starts. Pre-processing therefore reads the cache with the
/// fingerprint of its own prompt and rescans on a miss.
///
/// # Failure Handling
///
/// Scan errors never reach the host. With `fail_closed` a failed scan
/// becomes a `block / CRITICAL / [scan-failure]` verdict; without it the
/// phase lets the content through.
///
/// # Housekeeping
///
/// The first hook call made inside a tokio runtime starts one background
/// task that sweeps expired verdicts and drained rate-limit windows every
/// `sweep_interval_secs`. Hosts that want it running before any traffic can
/// call [`start_sweeper`](Self::start_sweeper) themselves. The task stops
/// once the verdict store is dropped.
pub struct Warden {
    pub(crate) modes: ResolvedModes,
    pub(crate) fail_closed: bool,
    pub(crate) scanner: Arc<dyn Scanner>,
    pub(crate) cache: Arc<dyn VerdictStore>,
    pub(crate) policy: EnforcementPolicy,
    rate_limiter: Option<Arc<RateLimiter>>,
    metadata: AppMetadata,
    profile_name: Option<String>,
    sweep_interval: Option<Duration>,
    sweeper_started: AtomicBool,
}

impl Warden {
    /// Creates an orchestrator.
    ///
    /// Wraps `scanner` in a [`RateLimitedScanner`] when the rate limit is
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a feature is probabilistic while `fail_closed` is set
    /// - a numeric setting is out of range
    pub fn new(
        config: WardenConfig,
        scanner: Arc<dyn Scanner>,
        cache: Arc<dyn VerdictStore>,
    ) -> Result<Self> {
        let modes = config.validate()?;

        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.rate_limit)));
        let scanner: Arc<dyn Scanner> = match &rate_limiter {
            Some(limiter) => Arc::new(RateLimitedScanner::new(scanner, Arc::clone(limiter))),
            None => scanner,
        };

        let policy = EnforcementPolicy::new()
            .with_high_risk_tools(config.high_risk_tools.iter().cloned())
            .with_masking(config.dlp_mask_only);

        info!(
            audit = %modes.audit,
            context_injection = %modes.context_injection,
            outbound = %modes.outbound,
            tool_gating = %modes.tool_gating,
            fail_closed = config.modes.fail_closed,
            "Warden initialized"
        );

        Ok(Self {
            modes,
            fail_closed: config.modes.fail_closed,
            scanner,
            cache,
            policy,
            rate_limiter,
            metadata: AppMetadata {
                app_name: config.app_name.clone(),
                app_user: config.app_user.clone(),
                ai_model: config.ai_model.clone(),
            },
            profile_name: config.profile_name.clone(),
            sweep_interval: config.sweep_interval(),
            sweeper_started: AtomicBool::new(false),
        })
    }

    /// Creates an orchestrator with an [`InMemoryVerdictCache`] using the
    /// configured TTL.
    pub fn with_memory_cache(config: WardenConfig, scanner: Arc<dyn Scanner>) -> Result<Self> {
        let cache = Arc::new(InMemoryVerdictCache::new(config.cache_ttl()));
        Self::new(config, scanner, cache)
    }

    /// Starts the housekeeping task. Returns `None` when sweeping is
    /// disabled in configuration or the task is already running. Must be
    /// called from within a tokio runtime.
    pub fn start_sweeper(&self) -> Option<JoinHandle<()>> {
        let every = self.sweep_interval?;
        if self.sweeper_started.swap(true, Ordering::SeqCst) {
            return None;
        }

        let cache = Arc::downgrade(&self.cache);
        let limiter = self.rate_limiter.as_ref().map(Arc::downgrade);
        debug!(interval_secs = every.as_secs(), "Starting housekeeping sweep");

        Some(spawn_periodic(every, move || {
            let Some(cache) = cache.upgrade() else {
                debug!("Verdict store dropped, stopping housekeeping sweep");
                return false;
            };
            let evicted = cache.sweep();
            let forgotten = limiter
                .as_ref()
                .and_then(|limiter| limiter.upgrade())
                .map_or(0, |limiter| limiter.sweep());
            if evicted > 0 {
                debug!(evicted, remaining = cache.len(), "Swept expired verdicts");
            }
            if forgotten > 0 {
                debug!(forgotten, "Swept idle rate limit windows");
            }
            true
        }))
    }

    /// True once the housekeeping task has been started.
    pub fn sweeper_running(&self) -> bool {
        self.sweeper_started.load(Ordering::SeqCst)
    }

    fn ensure_sweeper(&self) {
        if !self.sweeper_started.load(Ordering::SeqCst)
            && tokio::runtime::Handle::try_current().is_ok()
        {
            // Dropping the handle detaches the task.
            let _ = self.start_sweeper();
        }
    }

    /// The rate limiter in front of the scanner, when enabled.
    pub fn rate_limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.rate_limiter.as_ref()
    }

    /// Resolved feature modes.
    pub fn modes(&self) -> &ResolvedModes {
        &self.modes
    }

    /// The verdict store.
    pub fn cache(&self) -> &Arc<dyn VerdictStore> {
        &self.cache
    }

    /// The enforcement policy.
    pub fn policy(&self) -> &EnforcementPolicy {
        &self.policy
    }

    pub(crate) fn prompt_request(&self, text: &str, session: &str) -> ScanRequest {
        ScanRequest::prompt(text)
            .with_session(session)
            .with_profile(self.profile_name.clone())
            .with_metadata(self.metadata.clone())
    }

    pub(crate) fn response_request(&self, text: &str, session: &str) -> ScanRequest {
        ScanRequest::response(text)
            .with_session(session)
            .with_profile(self.profile_name.clone())
            .with_metadata(self.metadata.clone())
    }

    /// Phase 1: inbound receipt.
    ///
    /// Spawns the scan and returns immediately. The returned handle may be
    /// dropped; it is only useful to tests and to hosts that want to await
    /// the scan. `None` when audit is not deterministic or the message is
    /// empty.
    pub fn on_message_received(&self, event: &InboundEvent) -> Option<JoinHandle<()>> {
        self.ensure_sweeper();
        if !self.modes.is_deterministic(Feature::Audit) {
            return None;
        }
        if event.content.trim().is_empty() {
            debug!("Skipping scan of empty inbound message");
            return None;
        }

        let key = event.cache_key();
        let fingerprint = Fingerprint::of(&event.content);
        let request = self.prompt_request(&event.content, &key);
        let scanner = Arc::clone(&self.scanner);
        let cache = Arc::clone(&self.cache);
        let fail_closed = self.fail_closed;

        Some(tokio::spawn(async move {
            match run_scan(scanner.as_ref(), request, "inbound").await {
                Ok(verdict) => cache.put(&key, verdict, Some(fingerprint)),
                Err(err) if fail_closed => {
                    cache.put(&key, Verdict::scan_failure(err.to_string()), Some(fingerprint));
                }
                Err(_) => {}
            }
        }))
    }

    /// Phase 2: context injection before the agent runs.
    pub async fn before_agent_start(&self, event: &AgentStartEvent) -> Option<ContextInjection> {
        self.ensure_sweeper();
        if !self.modes.is_deterministic(Feature::ContextInjection) {
            return None;
        }
        if event.prompt.trim().is_empty() {
            return None;
        }

        let key = event.cache_key();
        let fingerprint = Fingerprint::of(&event.prompt);

        let verdict = match self.cache.get_if_fresh(&key, &fingerprint) {
            Some(verdict) => {
                debug!(session = %key, scan_id = %verdict.scan_id, "Using cached verdict");
                verdict
            }
            None => {
                debug!(session = %key, "No fresh verdict cached, scanning prompt");
                let request = self.prompt_request(&event.prompt, &key);
                let verdict = match run_scan(self.scanner.as_ref(), request, "context").await {
                    Ok(verdict) => verdict,
                    Err(err) if self.fail_closed => Verdict::scan_failure(err.to_string()),
                    Err(_) => return None,
                };
                self.cache.put(&key, verdict.clone(), Some(fingerprint));
                verdict
            }
        };

        if verdict.is_safe() {
            self.cache.clear(&key);
            return None;
        }

        info!(
            session = %key,
            scan_id = %verdict.scan_id,
            severity = %verdict.severity.as_str(),
            "Injecting security warning"
        );
        self.policy
            .context_warning(&verdict)
            .map(|prepend_context| ContextInjection { prepend_context })
    }

    /// Phase 3: tool gating. Reads the cache only; a miss allows the call.
    pub fn before_tool_call(&self, event: &ToolCallEvent) -> Option<ToolCallDecision> {
        self.ensure_sweeper();
        if !self.modes.is_deterministic(Feature::ToolGating) {
            return None;
        }

        let key = event.cache_key();
        let Some(verdict) = self.cache.get(&key) else {
            debug!(session = %key, tool = %event.tool_name, "No verdict cached, allowing tool");
            return None;
        };

        let gate = self.policy.check_tool(&event.tool_name, &verdict);
        gate.block.then(|| ToolCallDecision {
            block: true,
            block_reason: gate.reason,
        })
    }

    /// Phase 4: outbound scan. Always scans the text being sent.
    pub async fn message_sending(&self, event: &OutboundEvent) -> Option<OutboundModification> {
        self.ensure_sweeper();
        if !self.modes.is_deterministic(Feature::Outbound) {
            return None;
        }
        if event.content.trim().is_empty() {
            return None;
        }

        let key = event.cache_key();
        let request = self.response_request(&event.content, &key);
        let verdict = match run_scan(self.scanner.as_ref(), request, "outbound").await {
            Ok(verdict) => verdict,
            Err(_) if self.fail_closed => {
                warn!(session = %key, "Outbound scan failed, withholding message");
                return Some(OutboundModification {
                    content: build_block_message(&[ThreatCategory::scan_failure()]),
                    cancel: false,
                });
            }
            Err(_) => return None,
        };

        match self.policy.check_outbound(&event.content, &verdict) {
            OutboundDecision::Allow => None,
            OutboundDecision::Warn { categories } => {
                warn!(
                    session = %key,
                    scan_id = %verdict.scan_id,
                    categories = ?categories,
                    "Outbound message flagged, sending unchanged"
                );
                None
            }
            OutboundDecision::Masked { content, redactions } => {
                info!(
                    session = %key,
                    scan_id = %verdict.scan_id,
                    redactions,
                    "Masked sensitive data in outbound message"
                );
                Some(OutboundModification {
                    content,
                    cancel: false,
                })
            }
            OutboundDecision::Blocked { message, categories } => {
                warn!(
                    session = %key,
                    scan_id = %verdict.scan_id,
                    categories = ?categories,
                    "Blocked outbound message"
                );
                Some(OutboundModification {
                    content: message,
                    cancel: false,
                })
            }
        }
    }
}

/// Runs one scan and emits its audit record. Never logs the scanned text.
pub(crate) async fn run_scan(
    scanner: &dyn Scanner,
    request: ScanRequest,
    phase: &'static str,
) -> std::result::Result<Verdict, ScanError> {
    let session = request.session_id.clone().unwrap_or_default();
    let correlation_id = request.correlation_id.clone();
    let started = Instant::now();

    match scanner.scan(request).await {
        Ok(mut verdict) => {
            if verdict.latency_ms == 0 {
                verdict.latency_ms = started.elapsed().as_millis() as u64;
            }
            if verdict.correlation_id.is_none() {
                verdict.correlation_id = Some(correlation_id);
            }
            info!(
                phase,
                session = %session,
                scan_id = %verdict.scan_id,
                report_id = %verdict.report_id,
                action = %verdict.action,
                severity = %verdict.severity.as_str(),
                categories = ?verdict.category_names(),
                latency_ms = verdict.latency_ms,
                "Scan complete"
            );
            if verdict.timed_out {
                warn!(phase, scan_id = %verdict.scan_id, "Scan timed out before all detectors finished");
            }
            Ok(verdict)
        }
        Err(err) => {
            warn!(
                phase,
                session = %session,
                correlation_id = %correlation_id,
                error = %err,
                "Scan failed"
            );
            Err(err)
        }
    }
}
