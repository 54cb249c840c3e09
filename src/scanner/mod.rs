//! Scanner module - bounded-concurrency TCP port sweeps.
//!
//! A [`Scanner`] resolves its target once, then probes every requested port
//! exactly once. Probe tasks are only spawned after they win a semaphore
//! permit, so the number of in-flight connection attempts never exceeds
//! [`ScanOptions::concurrency_limit`] regardless of how many ports are asked
//! for. Completed probes are drained from a `JoinSet` as they finish.
//!
//! Per-port failures never surface as errors: they are tallied and the port
//! is simply not reported open. Only validation errors and cancellation end a
//! scan early, and a cancelled scan never returns a partial result.

pub mod tcp;
pub mod traits;

use crate::error::{ProbeError, ScanError};
use crate::types::{Port, ScanTarget, TargetSpec};
use futures::FutureExt;
use indicatif::ProgressBar;
use std::any::Any;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub use tcp::TcpConnectProber;
pub use traits::{ProbeOutcome, ProbeTally, Prober};

/// Default number of simultaneous connection attempts.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 1000;

/// Default time allowed for a single connect attempt.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Tuning knobs for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Maximum number of probes in flight at once. Must be positive.
    pub concurrency_limit: usize,
    /// Time after which an unanswered connect counts as not open.
    pub per_probe_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            per_probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_probe_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.concurrency_limit == 0 {
            return Err(ScanError::InvalidConfig(
                "concurrency limit must be at least 1".to_string(),
            ));
        }
        if self.concurrency_limit > Semaphore::MAX_PERMITS {
            return Err(ScanError::InvalidConfig(format!(
                "concurrency limit {} exceeds {}",
                self.concurrency_limit,
                Semaphore::MAX_PERMITS
            )));
        }
        if self.per_probe_timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a completed scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// The target as resolved at the start of the scan.
    pub target: ScanTarget,
    /// Open ports, ascending, without duplicates.
    pub open_ports: Vec<u16>,
    /// How every probe ended.
    pub tally: ProbeTally,
    /// Wall time from first dispatch to last completion.
    pub duration: Duration,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.open_ports.is_empty()
    }
}

/// Concurrent port scanner.
///
/// Generic over the [`Prober`] so the sweep logic can run against test
/// doubles; production code uses [`TcpConnectProber`].
pub struct Scanner<P = TcpConnectProber> {
    prober: Arc<P>,
    options: ScanOptions,
    progress: Option<ProgressBar>,
}

impl Scanner<TcpConnectProber> {
    /// Create a TCP connect scanner.
    pub fn new(options: ScanOptions) -> Self {
        Self::with_prober(TcpConnectProber::new(), options)
    }
}

impl Default for Scanner<TcpConnectProber> {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}

impl<P: Prober + 'static> Scanner<P> {
    pub fn with_prober(prober: P, options: ScanOptions) -> Self {
        Self {
            prober: Arc::new(prober),
            options,
            progress: None,
        }
    }

    /// Tick `progress` once per finished probe.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan `ports` on `host` and return the open ones.
    ///
    /// Runs to completion; drop the future or use [`Scanner::scan_until`] to
    /// abort it.
    pub async fn scan(&self, host: &str, ports: &[u16]) -> Result<ScanResult, ScanError> {
        self.scan_until(host, ports, CancellationToken::new()).await
    }

    /// Like [`Scanner::scan`], but gives up with [`ScanError::Cancelled`]
    /// as soon as `cancel` fires.
    pub async fn scan_until(
        &self,
        host: &str,
        ports: &[u16],
        cancel: CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        self.options.validate()?;
        let spec = TargetSpec::parse(host)?;
        let ports = Port::collect_unique(ports)?;

        let target = spec.resolve_until(&cancel).await?;
        debug!(host, ip = %target.ip, "resolved scan target");

        self.sweep(target, ports, cancel).await
    }

    /// Scan an already resolved target.
    pub async fn scan_target(
        &self,
        target: &ScanTarget,
        ports: &[u16],
        cancel: CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        self.options.validate()?;
        let ports = Port::collect_unique(ports)?;
        self.sweep(target.clone(), ports, cancel).await
    }

    async fn sweep(
        &self,
        target: ScanTarget,
        ports: Vec<Port>,
        cancel: CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        let started = Instant::now();
        let timeout = self.options.per_probe_timeout;
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency_limit));
        let mut tasks: JoinSet<(u16, ProbeOutcome)> = JoinSet::new();
        let mut collector = Collector::new(self.progress.clone());

        info!(
            host = %target,
            ports = ports.len(),
            concurrency = self.options.concurrency_limit,
            timeout_ms = timeout.as_millis() as u64,
            "starting scan"
        );

        for port in ports {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                return Err(abort(tasks, &target, &collector).await);
            };

            while let Some(joined) = tasks.try_join_next() {
                collector.absorb(joined);
            }

            let prober = Arc::clone(&self.prober);
            let addr = SocketAddr::new(target.ip, port.as_u16());
            tasks.spawn(async move {
                let outcome = run_probe(prober.as_ref(), addr, timeout).await;
                drop(permit);
                (addr.port(), outcome)
            });
        }

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                joined = tasks.join_next() => Some(joined),
            };
            match next {
                None => return Err(abort(tasks, &target, &collector).await),
                Some(Some(joined)) => collector.absorb(joined),
                Some(None) => break,
            }
        }

        let (open_ports, tally) = collector.finish();
        let duration = started.elapsed();

        debug!(
            host = %target,
            probed = tally.probed,
            closed = tally.closed,
            timed_out = tally.timed_out,
            errored = tally.errored,
            "probe tally"
        );
        info!(
            host = %target,
            open = open_ports.len(),
            not_open = tally.not_open(),
            elapsed_ms = duration.as_millis() as u64,
            "scan complete"
        );

        Ok(ScanResult {
            target,
            open_ports,
            tally,
            duration,
        })
    }
}

/// One probe, bounded by `timeout` and isolated from panics.
async fn run_probe<P: Prober + ?Sized>(
    prober: &P,
    addr: SocketAddr,
    timeout: Duration,
) -> ProbeOutcome {
    let attempt = AssertUnwindSafe(prober.probe(addr)).catch_unwind();
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(panic)) => ProbeOutcome::Error(ProbeError::Panicked(panic_message(&*panic))),
        Err(_) => ProbeOutcome::Error(ProbeError::TimedOut),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Abort every in-flight probe and wait until their sockets are gone.
async fn abort(
    mut tasks: JoinSet<(u16, ProbeOutcome)>,
    target: &ScanTarget,
    collector: &Collector,
) -> ScanError {
    let in_flight = tasks.len();
    tasks.shutdown().await;
    warn!(
        host = %target,
        probed = collector.tally.probed,
        in_flight,
        "scan cancelled"
    );
    ScanError::Cancelled
}

/// Accumulates finished probes. Only the dispatching task touches it.
struct Collector {
    open: Vec<u16>,
    tally: ProbeTally,
    progress: Option<ProgressBar>,
}

impl Collector {
    fn new(progress: Option<ProgressBar>) -> Self {
        Self {
            open: Vec::new(),
            tally: ProbeTally::default(),
            progress,
        }
    }

    fn absorb(&mut self, joined: Result<(u16, ProbeOutcome), JoinError>) {
        let (port, outcome) = match joined {
            Ok(finished) => finished,
            Err(e) => {
                // Probes catch their own panics; this is an externally aborted task.
                warn!(error = %e, "probe task failed");
                self.tally.errored += 1;
                return;
            }
        };

        self.tally.record(&outcome);
        match &outcome {
            ProbeOutcome::Open => {
                trace!(port, "open");
                self.open.push(port);
            }
            ProbeOutcome::Closed => {}
            ProbeOutcome::Error(reason) => trace!(port, %reason, "probe failed"),
        }

        if let Some(pb) = &self.progress {
            pb.inc(1);
            if outcome.is_open() {
                pb.set_message(format!("found open port {}", port));
            }
        }
    }

    fn finish(mut self) -> (Vec<u16>, ProbeTally) {
        self.open.sort_unstable();
        self.open.dedup();
        (self.open, self.tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts connections on a fixed set of ports, refuses the rest.
    struct FixedTarget {
        open: HashSet<u16>,
    }

    impl FixedTarget {
        fn new(open: &[u16]) -> Self {
            Self {
                open: open.iter().copied().collect(),
            }
        }
    }

    #[async_trait]
    impl Prober for FixedTarget {
        async fn probe(&self, addr: SocketAddr) -> ProbeOutcome {
            if self.open.contains(&addr.port()) {
                ProbeOutcome::Open
            } else {
                ProbeOutcome::Closed
            }
        }
    }

    /// Records how many probes run at the same time.
    #[derive(Default)]
    struct Instrumented {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Prober for Instrumented {
        async fn probe(&self, _addr: SocketAddr) -> ProbeOutcome {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ProbeOutcome::Closed
        }
    }

    struct Hanging;

    #[async_trait]
    impl Prober for Hanging {
        async fn probe(&self, _addr: SocketAddr) -> ProbeOutcome {
            std::future::pending().await
        }
    }

    struct PanicsOn(u16);

    #[async_trait]
    impl Prober for PanicsOn {
        async fn probe(&self, addr: SocketAddr) -> ProbeOutcome {
            if addr.port() == self.0 {
                panic!("probe blew up on {}", addr.port());
            }
            ProbeOutcome::Open
        }
    }

    fn localhost() -> ScanTarget {
        ScanTarget::new("127.0.0.1", IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    fn range(start: u16, end: u16) -> Vec<u16> {
        (start..=end).collect()
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.concurrency_limit, 1000);
        assert_eq!(options.per_probe_timeout, Duration::from_millis(500));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_validation() {
        let zero = ScanOptions::new().with_concurrency_limit(0);
        assert!(matches!(zero.validate(), Err(ScanError::InvalidConfig(_))));

        let instant = ScanOptions::new().with_timeout(Duration::ZERO);
        assert!(matches!(instant.validate(), Err(ScanError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_finds_exactly_the_open_ports() {
        let scanner = Scanner::with_prober(FixedTarget::new(&[443, 22, 80]), ScanOptions::new());
        let result = scanner.scan("127.0.0.1", &range(1, 100)).await.unwrap();

        assert_eq!(result.open_ports, vec![22, 80]);
        assert_eq!(result.tally.probed, 100);
        assert_eq!(result.tally.open, 2);
        assert_eq!(result.tally.closed, 98);
    }

    #[tokio::test]
    async fn test_duplicates_probed_once() {
        let prober = Arc::new(Instrumented::default());
        let scanner = Scanner::with_prober(Arc::clone(&prober), ScanOptions::new());

        scanner
            .scan_target(&localhost(), &[80, 80, 81, 80, 81], CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrency_limit_respected() {
        let prober = Arc::new(Instrumented::default());
        let options = ScanOptions::new().with_concurrency_limit(8);
        let scanner = Scanner::with_prober(Arc::clone(&prober), options);

        let result = scanner
            .scan_target(&localhost(), &range(1, 200), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.tally.probed, 200);
        assert!(prober.peak.load(Ordering::SeqCst) <= 8);
        assert!(prober.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_hanging_probe_times_out() {
        let options = ScanOptions::new().with_timeout(Duration::from_millis(50));
        let scanner = Scanner::with_prober(Hanging, options);

        let started = Instant::now();
        let result = scanner
            .scan_target(&localhost(), &[8080], CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.tally.timed_out, 1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_panicking_probe_is_isolated() {
        let scanner = Scanner::with_prober(PanicsOn(13), ScanOptions::new());
        let result = scanner
            .scan_target(&localhost(), &range(10, 15), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.open_ports, vec![10, 11, 12, 14, 15]);
        assert_eq!(result.tally.errored, 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let scanner = Scanner::with_prober(FixedTarget::new(&[80]), ScanOptions::new());
        let err = scanner.scan_until("127.0.0.1", &[80], cancel).await.unwrap_err();
        assert_eq!(err, ScanError::Cancelled);
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let scanner = Scanner::with_prober(FixedTarget::new(&[]), ScanOptions::new());

        let err = scanner.scan("", &range(1, 100)).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidTarget { .. }));

        let err = scanner.scan("127.0.0.1", &[]).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidRange(_)));

        let err = scanner.scan("127.0.0.1", &[0, 80]).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidRange(_)));

        let options = ScanOptions::new().with_concurrency_limit(0);
        let bad = Scanner::with_prober(FixedTarget::new(&[]), options);
        let err = bad.scan("127.0.0.1", &[80]).await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidConfig(_)));
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*boxed), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
