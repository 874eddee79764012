//! Gateway: the explicit context object the transport calls once per event.
//!
//! Owns the router, executor, presenter and audit log. There are no
//! process-wide globals; everything hangs off one `Arc<Gateway>`.

use std::sync::Arc;

use tokio::time::Instant;

use crate::{
    audit::{AuditEvent, AuditLogger},
    config::Config,
    executor::{Executor, ExecutorConfig},
    operation::OperationInput,
    presenter::{MenuLayout, OutboundMessage, Presenter},
    registry::Registry,
    router::{Bootstrap, InboundEvent, Payload, Route, Router},
    Result,
};

pub struct Gateway {
    router: Router,
    executor: Executor,
    presenter: Presenter,
    audit: Option<AuditLogger>,
}

impl Gateway {
    pub fn new(registry: Arc<Registry>, executor: ExecutorConfig, audit: Option<AuditLogger>) -> Self {
        Self {
            presenter: Presenter::new(&registry),
            router: Router::new(registry),
            executor: Executor::new(executor),
            audit,
        }
    }

    /// Built-in command table with settings from `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let registry = Arc::new(Registry::builtin()?);
        let audit = AuditLogger::new(cfg.audit_log_path.clone(), cfg.audit_log_json);
        Ok(Self::new(registry, cfg.executor.clone(), Some(audit)))
    }

    pub fn menu(&self) -> &MenuLayout {
        self.presenter.render_menu()
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub async fn handle(&self, event: InboundEvent) -> OutboundMessage {
        let user_id = event.user_id;
        match self.router.route(&event) {
            Route::Bootstrap(Bootstrap::Start) => {
                tracing::info!(%user_id, "user started the bot");
                self.audit(AuditEvent::bootstrap(user_id, "start"));
                self.presenter.render_welcome(event.first_name.as_deref())
            }
            Route::Bootstrap(Bootstrap::Help) => {
                self.audit(AuditEvent::bootstrap(user_id, "help"));
                self.presenter.render_help()
            }
            Route::Bootstrap(Bootstrap::Cancel) => {
                let cancelled = self.executor.cancel(user_id);
                tracing::info!(%user_id, cancelled, "cancel requested");
                self.audit(AuditEvent::bootstrap(user_id, "cancel"));
                self.presenter.render_cancel(cancelled)
            }
            Route::Operation { spec, input } => {
                tracing::info!(%user_id, command = %spec.id, "user requested {}", spec.identifier);
                let label = input_label(&input);
                let started = Instant::now();
                let result = self.executor.execute(user_id, spec, &event, input).await;
                let elapsed_ms = started.elapsed().as_millis() as u64;
                self.audit(AuditEvent::execution(
                    user_id, spec.id, label, &result, elapsed_ms,
                ));
                self.presenter.render_result(&result)
            }
            Route::Unrecognized => {
                self.audit(AuditEvent::unrecognized(user_id, unrecognized_content(&event)));
                self.presenter.render_fallback()
            }
        }
    }

    /// Handle the event on its own task so a panic anywhere in routing,
    /// execution or rendering becomes a generic error reply.
    pub async fn handle_isolated(self: &Arc<Self>, event: InboundEvent) -> OutboundMessage {
        let user_id = event.user_id;
        let gateway = Arc::clone(self);
        match tokio::spawn(async move { gateway.handle(event).await }).await {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!(%user_id, error = %e, "exception while handling an update");
                self.presenter.render_internal_fault()
            }
        }
    }

    pub fn render_internal_fault(&self) -> OutboundMessage {
        self.presenter.render_internal_fault()
    }

    fn audit(&self, event: AuditEvent) {
        let Some(log) = &self.audit else {
            return;
        };
        if let Err(e) = log.write(event) {
            tracing::warn!(error = %e, path = %log.path().display(), "audit write failed");
        }
    }
}

fn input_label(input: &OperationInput) -> &'static str {
    match input {
        OperationInput::None => "none",
        OperationInput::Argument(_) => "argument",
        OperationInput::Attachment(_) => "attachment",
    }
}

fn unrecognized_content(event: &InboundEvent) -> &str {
    match &event.payload {
        Payload::Text(t) => t.as_str(),
        Payload::Attachment { caption, .. } => caption.as_deref().unwrap_or("<attachment>"),
    }
}
