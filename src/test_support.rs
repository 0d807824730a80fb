use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use actix_web::dev::{Service as _, ServerHandle};
use actix_web::{App, HttpServer, web};

use crate::domain::clock::{Clock, TimestampMs};

pub struct FakeUpstream {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    handle: ServerHandle,
}

impl FakeUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        let handle = self.handle.clone();
        actix_web::rt::spawn(async move { handle.stop(false).await });
    }
}

/// Binds a fake upstream on an ephemeral port. Must be called inside an
/// actix system, e.g. from an `#[actix_web::test]`.
pub fn spawn_upstream<F>(configure: F) -> FakeUpstream
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let server = HttpServer::new(move || {
        let counter = Arc::clone(&counter);
        App::new()
            .wrap_fn(move |req, srv| {
                counter.fetch_add(1, Ordering::SeqCst);
                srv.call(req)
            })
            .configure(configure.clone())
    })
    .workers(1)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .expect("fake upstream should bind");

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    FakeUpstream {
        base_url: format!("http://{addr}"),
        hits,
        handle,
    }
}

pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(millis: i64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(millis),
        })
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now.fetch_add(secs * 1_000, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> TimestampMs {
        TimestampMs(self.now.load(Ordering::SeqCst))
    }
}
