use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use super::{Decision, Guard, GuardChain};
use crate::{auth::session::RequestContext, flash, state::AppState};

/// Puts `guards` in front of every method of `route`, in the given order.
/// Methods and path binding of the route are untouched.
pub fn guarded(route: MethodRouter<AppState>, guards: &[Guard]) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        GuardChain::new(guards),
        enforce,
    ))
}

async fn enforce(
    State(chain): State<GuardChain>,
    ctx: RequestContext,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    let requested = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    match chain.evaluate(&ctx.caller, &requested) {
        Decision::Allow => next.run(req).await,
        Decision::Deny(denial) => {
            info!(
                reason = ?denial.reason,
                path = %requested,
                user_id = ?ctx.caller.user().map(|u| u.id),
                "request denied"
            );
            flash::deny(jar, denial.message, denial.severity, &denial.target)
        }
    }
}
