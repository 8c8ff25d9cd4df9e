use std::error::Error;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::cli::config::AppConfig;
use crate::form::controller::SubmissionController;
use crate::form::form_model::{Phase, StateSnapshot};
use crate::remote::actions::{HistoryAction, LoginAction, RegisterAction, ShortenAction};
use crate::remote::client::ServiceClient;
use crate::remote::remote_model::RemoteAction;
use crate::report::console::{format_session, format_state};
use crate::session::store::{CookieSession, JWT_COOKIE, SessionError, SessionStore};
use crate::trace::logger::TraceLogger;
use crate::validate::forms::{HistoryValidator, ShortenValidator, field, login_rules, register_rules};
use crate::validate::validator::Validator;

pub const REGISTER_TITLE: &str = "Sign up";
pub const LOGIN_TITLE: &str = "Log in";
pub const SHORTEN_TITLE: &str = "Shorten";
pub const HISTORY_TITLE: &str = "History";

// ============================================================================
// Shared context
// ============================================================================

/// Everything a command needs: resolved config, the session jar, the
/// service client built on top of it and the optional journal.
pub struct Context {
    pub config: AppConfig,
    pub session: Arc<CookieSession>,
    pub client: Arc<ServiceClient>,
    pub tracer: Option<Arc<TraceLogger>>,
}

impl Context {
    pub fn open(config: AppConfig) -> Result<Self, Box<dyn Error>> {
        let session = Arc::new(CookieSession::load(Path::new(&config.session_file))?);
        let client = Arc::new(ServiceClient::new(
            config.build_endpoints()?,
            session.clone(),
            config.request_timeout(),
        )?);
        let tracer = config
            .trace_file
            .as_deref()
            .map(|path| Arc::new(TraceLogger::new(path)));

        Ok(Self {
            config,
            session,
            client,
            tracer,
        })
    }

    pub fn save_session(&self) -> Result<(), SessionError> {
        self.session.save(Path::new(&self.config.session_file))
    }

    fn session_store(&self) -> Arc<dyn SessionStore> {
        self.session.clone()
    }

    fn controller<A: RemoteAction>(
        &self,
        form: &str,
        validator: impl Validator + 'static,
        action: A,
    ) -> SubmissionController<A> {
        let controller = SubmissionController::new(form, validator, action);
        match &self.tracer {
            Some(tracer) => controller.with_tracer(tracer.clone()),
            None => controller,
        }
    }

    pub fn register_form(&self) -> SubmissionController<RegisterAction> {
        self.controller("register", register_rules(), RegisterAction::new(self.client.clone()))
    }

    pub fn login_form(&self) -> SubmissionController<LoginAction> {
        self.controller("login", login_rules(), LoginAction::new(self.client.clone()))
    }

    pub fn shorten_form(&self) -> SubmissionController<ShortenAction> {
        self.controller(
            "shorten",
            ShortenValidator::new(self.session_store()),
            ShortenAction::new(self.client.clone(), self.session_store()),
        )
    }

    pub fn history_form(&self) -> SubmissionController<HistoryAction> {
        self.controller(
            "history",
            HistoryValidator::new(self.session_store()),
            HistoryAction::new(self.client.clone()),
        )
    }
}

// ============================================================================
// Form runner
// ============================================================================

/// Submit `form` once, showing the busy indicator on stderr while the
/// request is outstanding. Returns the final snapshot.
pub async fn run_form<A>(form: &SubmissionController<A>, title: &str) -> StateSnapshot<A::Payload>
where
    A: RemoteAction + 'static,
    A::Payload: Display,
{
    let mut updates = form.subscribe();
    let title = title.to_string();
    let busy = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.phase == Phase::InFlight {
                eprint!("{}", format_state(&title, &snapshot));
            }
        }
    });

    form.submit().await;
    busy.abort();
    form.snapshot()
}

// ============================================================================
// register / login
// ============================================================================

pub async fn cmd_register(
    ctx: &Context,
    name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<bool, Box<dyn Error>> {
    let form = ctx.register_form();
    form.set_field(field::NAME, name);
    form.set_field(field::EMAIL, email);
    form.set_field(field::PASSWORD, password);
    form.set_field(field::CONFIRM_PASSWORD, confirm_password);

    let snapshot = run_form(&form, REGISTER_TITLE).await;
    if snapshot.phase == Phase::Succeeded {
        ctx.save_session()?;
        println!("Account created for {}. You are now logged in.", email);
        return Ok(true);
    }

    print!("{}", format_state(REGISTER_TITLE, &snapshot));
    Ok(false)
}

pub async fn cmd_login(ctx: &Context, email: &str, password: &str) -> Result<bool, Box<dyn Error>> {
    let form = ctx.login_form();
    form.set_field(field::EMAIL, email);
    form.set_field(field::PASSWORD, password);

    let snapshot = run_form(&form, LOGIN_TITLE).await;
    if snapshot.phase == Phase::Succeeded {
        ctx.save_session()?;
        println!("Logged in as {}", email);
        return Ok(true);
    }

    print!("{}", format_state(LOGIN_TITLE, &snapshot));
    Ok(false)
}

// ============================================================================
// shorten
// ============================================================================

pub async fn cmd_shorten(
    ctx: &Context,
    url: &str,
    expiration: Option<u32>,
) -> Result<bool, Box<dyn Error>> {
    let form = ctx.shorten_form();
    form.set_field(field::URL, url);

    if ctx.session.is_authenticated() {
        let days = expiration.unwrap_or(ctx.config.default_expiration_days);
        form.set_field(field::EXPIRATION, days.to_string());
    } else if expiration.is_some() {
        warn!("expiration is only available to logged-in users; ignoring it");
    }

    let snapshot = run_form(&form, SHORTEN_TITLE).await;
    print!("{}", format_state(SHORTEN_TITLE, &snapshot));
    Ok(snapshot.phase == Phase::Succeeded)
}

// ============================================================================
// history / logout / status
// ============================================================================

pub async fn cmd_history(ctx: &Context) -> Result<bool, Box<dyn Error>> {
    let form = ctx.history_form();
    let snapshot = run_form(&form, HISTORY_TITLE).await;
    print!("{}", format_state(HISTORY_TITLE, &snapshot));
    Ok(snapshot.phase == Phase::Succeeded)
}

pub fn cmd_logout(ctx: &Context) -> Result<(), Box<dyn Error>> {
    ctx.session.clear();
    ctx.save_session()?;
    println!("Logged out");
    Ok(())
}

pub fn cmd_status(ctx: &Context) {
    print!(
        "{}",
        format_session(
            ctx.session.is_authenticated(),
            ctx.session.cookie(JWT_COOKIE).is_some()
        )
    );
}
