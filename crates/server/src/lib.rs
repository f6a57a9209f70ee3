use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use simcity_engine::GameConfig;
use simcity_protocol::UiUpdate;
use std::future::Future;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod client;
pub mod config;
pub mod gate;
pub mod render;
pub mod session;


pub use client::{GameClient, RpcError};
pub use config::ViewerConfig;
pub use gate::{RequestGate, Ticket};
pub use session::{NavOp, ViewerSession};

pub struct AppState {
    pub game: Arc<GameConfig>,
    pub client: GameClient,
    pub session: Mutex<ViewerSession>,
    pub gate: RequestGate,
}

impl AppState {
    pub fn new(config: &ViewerConfig) -> anyhow::Result<Self> {
        let game = Arc::new(config.game.clone());
        let client = GameClient::new(
            &config.api_url,
            Duration::from_millis(config.request_timeout_ms),
        )
        .context("build http client")?;
        Ok(Self {
            session: Mutex::new(ViewerSession::new(Arc::clone(&game))),
            game,
            client,
            gate: RequestGate::new(),
        })
    }
}

type Reply = (StatusCode, Json<UiUpdate>);

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/api/state", get(snapshot))
        .route("/api/session", post(new_session))
        .route("/api/play/reset", post(play_reset))
        .route("/api/play/select", post(play_select))
        .route("/api/play/choose", post(play_choose))
        .route("/api/play/submit", post(play_submit))
        .route("/api/sim/simulate", post(sim_simulate))
        .route("/api/sim/nav", post(sim_nav))
        .route("/api/sim/builders", post(sim_builders))
        .with_state(Arc::new(state))
        // Local security: allow only loopback + Tailscale by default.
        .layer(middleware::from_fn(ip_allowlist))
        // Never `Access-Control-Allow-Origin: *`: the viewer drives a live game server.
        .layer(local_only_cors())
}

async fn health() -> &'static str {
    "ok"
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

fn reply(state: &AppState, session: &mut ViewerSession, status: StatusCode, event: &str) -> Reply {
    let mut update = session.render(event);
    if let Some(serde_json::Value::Object(payload)) = update.payload.as_mut() {
        payload.insert("generation".into(), json!(state.gate.generation()));
        payload.insert("busy".into(), json!(state.gate.is_busy()));
    }
    (status, Json(update))
}

async fn snapshot(State(state): State<Arc<AppState>>) -> Reply {
    let mut session = state.session.lock().await;
    reply(&state, &mut session, StatusCode::OK, "state")
}

/// Start over with a fresh session. Anything still in flight for the old
/// one is discarded when it lands.
async fn new_session(State(state): State<Arc<AppState>>) -> Reply {
    state.gate.invalidate();
    let mut session = state.session.lock().await;
    *session = ViewerSession::new(Arc::clone(&state.game));
    tracing::info!(generation = state.gate.generation(), "new viewer session");
    reply(&state, &mut session, StatusCode::OK, "session.new")
}

async fn play_reset(State(state): State<Arc<AppState>>) -> Reply {
    run_rpc(&state, "play.reset", state.client.reset(), |s, resp| {
        s.apply_reset(resp)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct SelectInput {
    row: usize,
    col: usize,
}

async fn play_select(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SelectInput>,
) -> Reply {
    let mut session = state.session.lock().await;
    session.user_action();
    session.select(input.row, input.col);
    reply(&state, &mut session, StatusCode::OK, "play.select")
}

#[derive(Debug, Deserialize)]
struct ChooseInput {
    #[serde(default)]
    action: String,
}

async fn play_choose(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ChooseInput>,
) -> Reply {
    let mut session = state.session.lock().await;
    session.user_action();
    session.choose_str(&input.action);
    reply(&state, &mut session, StatusCode::OK, "play.choose")
}

async fn play_submit(State(state): State<Arc<AppState>>) -> Reply {
    const EVENT: &str = "play.submit";
    let Some(ticket) = state.gate.try_begin() else {
        return busy_reply(&state, EVENT).await;
    };
    let req = {
        let mut session = state.session.lock().await;
        session.user_action();
        match session.step_request() {
            Some(req) => req,
            None => {
                drop(ticket);
                return reply(&state, &mut session, StatusCode::OK, EVENT);
            }
        }
    };
    tracing::info!(actions = ?req.user_actions, "submitting human action");
    let result = state.client.step(&req).await;
    finish(&state, ticket, EVENT, result, |s, resp| s.apply_step(resp)).await
}

async fn sim_simulate(State(state): State<Arc<AppState>>) -> Reply {
    run_rpc(&state, "sim.simulate", state.client.simulate(), |s, resp| {
        s.apply_simulation(resp)
    })
    .await
}

#[derive(Debug, Deserialize)]
struct NavInput {
    op: NavOp,
}

async fn sim_nav(State(state): State<Arc<AppState>>, Json(input): Json<NavInput>) -> Reply {
    let mut session = state.session.lock().await;
    session.user_action();
    session.navigate(input.op);
    reply(&state, &mut session, StatusCode::OK, "sim.nav")
}

async fn sim_builders(State(state): State<Arc<AppState>>) -> Reply {
    let mut session = state.session.lock().await;
    session.toggle_builders();
    reply(&state, &mut session, StatusCode::OK, "sim.builders")
}

/// Gate, call the simulation server, then fold the answer into the session.
/// The session lock is not held while the call is outstanding.
async fn run_rpc<T>(
    state: &AppState,
    event: &str,
    call: impl Future<Output = Result<T, RpcError>>,
    apply: impl FnOnce(&mut ViewerSession, T) -> Result<(), RpcError>,
) -> Reply {
    let Some(ticket) = state.gate.try_begin() else {
        return busy_reply(state, event).await;
    };
    state.session.lock().await.user_action();
    let result = call.await;
    finish(state, ticket, event, result, apply).await
}

async fn finish<T>(
    state: &AppState,
    ticket: Ticket<'_>,
    event: &str,
    result: Result<T, RpcError>,
    apply: impl FnOnce(&mut ViewerSession, T) -> Result<(), RpcError>,
) -> Reply {
    let mut session = state.session.lock().await;
    if !ticket.is_current() {
        tracing::info!(generation = ticket.generation(), event, "discarding stale completion");
        drop(ticket);
        return reply(state, &mut session, StatusCode::CONFLICT, event);
    }
    let status = match result.and_then(|v| apply(&mut session, v)) {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            session.rpc_failed(&err);
            StatusCode::BAD_GATEWAY
        }
    };
    drop(ticket);
    reply(state, &mut session, status, event)
}

async fn busy_reply(state: &AppState, event: &str) -> Reply {
    tracing::debug!(event, "rejected, request already in flight");
    let mut session = state.session.lock().await;
    session.busy();
    reply(state, &mut session, StatusCode::CONFLICT, event)
}

pub async fn serve(addr: SocketAddr, config: ViewerConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    serve_listener(listener, config, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    })
    .await?;
    Ok(())
}

pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    config: ViewerConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<SocketAddr> {
    let state = AppState::new(&config)?;
    let app = build_router(state);
    let addr = listener.local_addr()?;
    tracing::info!(%addr, api_url = %config.api_url, "viewer listening on http://{addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(addr)
}

async fn ip_allowlist(
    axum::extract::ConnectInfo(peer): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let ip = peer.ip();
    if is_allowed_peer_ip(ip) {
        return next.run(req).await;
    }
    tracing::warn!(%ip, "refusing peer");
    (StatusCode::FORBIDDEN, "forbidden").into_response()
}

fn is_allowed_peer_ip(ip: IpAddr) -> bool {
    if ip.is_loopback() {
        return true;
    }

    // Tailscale CGNAT range (100.64.0.0/10).
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            o[0] == 100 && (64..=127).contains(&o[1])
        }
        IpAddr::V6(_v6) => false,
    }
}

fn local_only_cors() -> CorsLayer {
    use axum::http::header;
    use axum::http::HeaderValue;
    use axum::http::Method;

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _req| {
            is_allowed_local_origin(origin)
        }))
}

fn is_allowed_local_origin(origin: &axum::http::HeaderValue) -> bool {
    let Ok(s) = origin.to_str() else {
        return false;
    };
    is_http_origin_for_host(s, "localhost") || is_http_origin_for_host(s, "127.0.0.1")
}

fn is_http_origin_for_host(origin: &str, host: &str) -> bool {
    for scheme in ["http://", "https://"] {
        if let Some(rest) = origin.strip_prefix(scheme) {
            if let Some(after) = rest.strip_prefix(host) {
                // scheme://host[:port] only
                return after.is_empty() || after.starts_with(':');
            }
        }
    }
    false
}

const DASHBOARD_HTML: &str = r###"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <meta name="theme-color" content="#081427" />
  <title>SimCity Viewer</title>
  <style>
    :root{
      --bg-a:#050913;
      --bg-b:#081325;
      --ice:#e6fbff;
      --teal:#6ff8ff;
      --blue:#68c7ff;
      --panel:#0b1a2dcc;
      --panel-edge:#73c7ff55;
      --muted:#8aa3be;
      --ok:#4df5bf;
      --warn:#ffd06b;
      --bad:#ff7198;
    }
    *{box-sizing:border-box;margin:0;padding:0}
    body{
      font-family:Inter,system-ui,sans-serif;color:var(--ice);min-height:100vh;
      background:linear-gradient(165deg,#0a1a31 0%,var(--bg-b) 45%,var(--bg-a) 100%);
      padding:12px;
    }
    .topbar{
      display:flex;gap:12px;align-items:center;justify-content:space-between;
      padding:10px 12px;border:1px solid var(--panel-edge);border-radius:14px;
      background:linear-gradient(160deg,#0c223b 0%, #081427 100%);margin-bottom:12px;
    }
    .brand h1{font-size:14px;letter-spacing:.7px}
    .brand .sub{font-size:11px;color:var(--muted)}
    .pill{display:flex;align-items:center;gap:8px;font-size:12px;color:var(--muted)}
    .dot{width:8px;height:8px;border-radius:99px;background:var(--warn)}
    .dot.ok{background:var(--ok)}
    .btn{
      border:1px solid #4f799f;background:#0b1b30;color:var(--ice);
      border-radius:10px;padding:8px 10px;font-weight:600;cursor:pointer;margin:2px;
    }
    .btn:hover{border-color:#8de7ff}
    .btn.on{border-color:var(--teal);box-shadow:0 0 0 1px #6ff8ff88 inset}
    .btn.primary{background:#12385c}
    .btn:disabled{opacity:.4;cursor:default}
    .grid{display:grid;grid-template-columns:1fr 1fr;gap:12px}
    .panel{border:1px solid var(--panel-edge);border-radius:16px;background:var(--panel);padding:12px}
    .panel h2{font-size:13px;letter-spacing:.6px;margin-bottom:10px}
    .row{display:flex;gap:12px;align-items:flex-start;flex-wrap:wrap}
    table.board{border-collapse:separate;border-spacing:4px}
    td.cell{
      width:84px;height:64px;border-radius:10px;vertical-align:middle;text-align:center;
      color:#0b1528;font-size:12px;
    }
    td.cell.pick{cursor:pointer}
    td.cell .name{display:block;font-weight:700}
    td.cell .owner{display:block;font-size:10px}
    .players{display:flex;flex-direction:column;gap:8px;min-width:180px}
    .player{border:1px solid #4f799f55;border-radius:12px;padding:8px;font-size:12px;background:#061325aa}
    .player.on{border-color:var(--teal)}
    .muted{color:var(--muted);font-size:12px}
    pre.info{font-size:11px;background:#061325;border-radius:10px;padding:8px;overflow:auto;max-height:220px}
    #notice .notice{
      position:fixed;right:16px;bottom:16px;padding:10px 14px;border-radius:12px;
      background:#3a0d1c;border:1px solid var(--bad);font-size:13px;
    }
    @media (max-width: 980px){ .grid{grid-template-columns:1fr} }
  </style>
</head>
<body>
  <header class="topbar">
    <div class="brand">
      <h1>SIMCITY</h1>
      <div class="sub">Play and replay viewer (local)</div>
    </div>
    <div style="display:flex;align-items:center;gap:10px">
      <div class="pill"><span id="connDot" class="dot"></span><span id="connText">connecting</span></div>
      <button class="btn" type="button" data-post="/api/session">New Session</button>
    </div>
  </header>

  <div class="grid">
    <section class="panel">
      <h2>Play</h2>
      <div style="margin-bottom:8px">
        <button class="btn primary rpc" type="button" data-api="/api/play/reset">Reset Game</button>
      </div>
      <div class="row">
        <div id="play.board"></div>
        <div id="play.players"></div>
      </div>
      <div id="play.action" style="margin-top:10px"></div>
      <div id="play.step" style="margin-top:10px"></div>
    </section>

    <section class="panel">
      <h2>Simulation</h2>
      <div style="margin-bottom:8px">
        <button class="btn primary rpc" type="button" data-api="/api/sim/simulate">Simulate Episode</button>
        <button class="btn" type="button" data-post="/api/sim/builders">Toggle Builders</button>
      </div>
      <div class="row">
        <div id="sim.board"></div>
        <div id="sim.players"></div>
      </div>
      <div id="sim.turn" style="margin-top:10px"></div>
    </section>
  </div>

  <div id="notice"></div>

  <script>
  (function(){
    const $ = (id) => document.getElementById(id);
    let inflight = false;
    let noticeTimer = null;

    function setRpcDisabled(on){
      for (const b of document.querySelectorAll("button.rpc")) b.disabled = on;
    }

    function apply(u){
      if (!u || !Array.isArray(u.patches)) return;
      for (const p of u.patches){
        const t = $(p.target);
        if (!t) continue;
        if (p.swap === "replace" || !p.swap){
          t.innerHTML = p.html || "";
        }
        if (p.target === "notice" && p.payload && p.payload.ttl_ms){
          clearTimeout(noticeTimer);
          noticeTimer = setTimeout(() => { t.innerHTML = ""; }, p.payload.ttl_ms);
        }
      }
      setRpcDisabled(inflight);
    }

    async function post(path, body){
      try{
        const r = await fetch(path, {
          method: "POST",
          headers: { "content-type": "application/json" },
          body: JSON.stringify(body || {}),
        });
        apply(await r.json());
      }catch(_e){
        $("notice").innerHTML = '<div class="notice">Request failed. Please try again.</div>';
      }
    }

    async function rpc(path){
      if (inflight) return;
      inflight = true;
      setRpcDisabled(true);
      try{ await post(path); }
      finally{ inflight = false; setRpcDisabled(false); }
    }

    document.addEventListener("click", (e) => {
      const el = e.target.closest("[data-api],[data-post],[data-choice],[data-nav],td.cell.pick");
      if (!el || el.disabled) return;
      if (el.dataset.api) return rpc(el.dataset.api);
      if (el.dataset.post) return post(el.dataset.post);
      if (el.dataset.choice !== undefined) return post("/api/play/choose", { action: el.dataset.choice });
      if (el.dataset.nav) return post("/api/sim/nav", { op: el.dataset.nav });
      post("/api/play/select", { row: Number(el.dataset.row), col: Number(el.dataset.col) });
    });

    async function healthLoop(){
      for(;;){
        try{
          const r = await fetch("/health", { cache: "no-store" });
          if (!r.ok) throw new Error("bad");
          $("connDot").classList.add("ok");
          $("connText").textContent = "online";
        }catch(_e){
          $("connDot").classList.remove("ok");
          $("connText").textContent = "offline";
        }
        await new Promise(res => setTimeout(res, 1200));
      }
    }

    fetch("/api/state", { cache: "no-store" }).then(r => r.json()).then(apply).catch(() => {});
    healthLoop();
  })();
  </script>
</body>
</html>
"###;
