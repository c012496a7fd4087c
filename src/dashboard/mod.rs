use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::engine::error::EngineError;
use crate::engine::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Build the Axum router for the desk API and report page.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/trades", get(trades_handler))
        .route("/api/bankroll", get(bankroll_handler))
        .route("/api/performance", get(performance_handler))
        .route("/api/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// JSON error body: `{ "error": kind, "message": text }`.
#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::EmptyLedger) => StatusCode::NOT_FOUND,
            ApiError::Engine(EngineError::Ledger(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Engine(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Engine(e) => e.kind(),
            ApiError::BadRequest(_) => "bad_request",
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Engine(e) => e.to_string(),
            ApiError::BadRequest(m) => m.clone(),
        };
        if status.is_server_error() {
            error!("{}: {}", self.kind(), message);
        }
        (status, Json(json!({ "error": self.kind(), "message": message }))).into_response()
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn index_handler() -> impl IntoResponse {
    Html(REPORT_HTML)
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    /// Optional odds screenshot, base64 (a `data:` URL prefix is accepted).
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// POST /api/analyze
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let image = req
        .image_base64
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(decode_image)
        .transpose()?;
    let analysis = state
        .engine
        .analyze_match(&req.text, image.as_deref())
        .await?;
    Ok(Json(analysis))
}

fn decode_image(encoded: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("image_base64 is not valid base64: {}", e)))
}

/// GET /api/trades
async fn trades_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.ledger().trades())
}

/// GET /api/bankroll
async fn bankroll_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ledger = state.engine.ledger();
    Json(json!({
        "bankroll": ledger.bankroll(),
        "initial_bankroll": ledger.initial_bankroll(),
    }))
}

/// GET /api/performance
async fn performance_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.performance()?))
}

/// GET /api/health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = state.engine.ledger().snapshot();
    Json(json!({
        "status": "healthy",
        "trades_count": snap.trades.len(),
        "bankroll": snap.bankroll,
        "timestamp": Utc::now(),
    }))
}

/// Embedded report page (HTML + CSS + JS)
const REPORT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Value Bet Desk</title>
<style>
  :root { --bg:#0f1117; --card:#1a1d27; --border:#2a2d3a; --accent:#6c63ff; --green:#00c896; --red:#ff4f6a; --text:#e0e0e0; --muted:#8888aa; }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .stats-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(170px, 1fr)); gap: 1rem; }
  .stat-card { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1.1rem; }
  .stat-card .label { color: var(--muted); font-size: .8rem; text-transform: uppercase; margin-bottom: .4rem; }
  .stat-card .value { font-size: 1.6rem; font-weight: 700; }
  .pos { color: var(--green); } .neg { color: var(--red); }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; }
  .panel-body { padding: 1rem; }
  textarea { width: 100%; min-height: 130px; background: var(--bg); color: var(--text); border: 1px solid var(--border); border-radius: 6px; padding: .6rem; font-family: monospace; }
  button { margin-top: .6rem; background: var(--accent); border: none; color: #fff; padding: .45rem 1rem; border-radius: 6px; cursor: pointer; }
  pre { white-space: pre-wrap; font-size: .82rem; color: var(--muted); margin-top: .8rem; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .7rem 1rem; text-align: left; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .6rem 1rem; font-size: .88rem; border-bottom: 1px solid #1e2130; }
  canvas { width: 100% !important; }
  .empty { color: var(--muted); text-align: center; padding: 2rem; }
</style>
</head>
<body>
<header><h1>⚽ Value Bet Desk</h1><span style="margin-left:auto;color:var(--muted);font-size:.8rem;" id="last-updated"></span></header>
<main>
  <div class="stats-grid">
    <div class="stat-card"><div class="label">Bankroll</div><div class="value" id="s-bankroll">–</div></div>
    <div class="stat-card"><div class="label">Trades</div><div class="value" id="s-trades">–</div></div>
    <div class="stat-card"><div class="label">Win Rate</div><div class="value" id="s-winrate">–</div></div>
    <div class="stat-card"><div class="label">Profit</div><div class="value" id="s-profit">–</div></div>
    <div class="stat-card"><div class="label">ROI</div><div class="value" id="s-roi">–</div></div>
    <div class="stat-card"><div class="label">Max Drawdown</div><div class="value neg" id="s-mdd">–</div></div>
  </div>

  <div class="panel">
    <div class="panel-header">Analyze a match</div>
    <div class="panel-body">
      <textarea id="report" placeholder="PSG vs Lorient&#10;1.45 4.60 6.50&#10;xg_home: 2.1 xg_away: 0.9"></textarea>
      <button onclick="analyze()">Analyze</button>
      <pre id="analysis"></pre>
    </div>
  </div>

  <div class="panel">
    <div class="panel-header">Cumulative profit and drawdown</div>
    <div class="panel-body"><canvas id="pnl-chart" height="200"></canvas></div>
  </div>

  <div class="panel">
    <div class="panel-header">Trades</div>
    <table>
      <thead><tr><th>ID</th><th>Match</th><th>Market</th><th>Odds</th><th>Stake</th><th>Result</th><th>Profit</th><th>Bankroll</th></tr></thead>
      <tbody id="trades-tbody"><tr><td colspan="8" class="empty">No trades yet</td></tr></tbody>
    </table>
  </div>
</main>
<script>
const money = v => (v >= 0 ? '' : '-') + Math.abs(v).toFixed(2);

async function analyze() {
  const text = document.getElementById('report').value;
  const r = await fetch('/api/analyze', { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify({ text }) });
  document.getElementById('analysis').textContent = JSON.stringify(await r.json(), null, 2);
  loadAll();
}

async function loadPerformance() {
  const r = await fetch('/api/performance');
  if (!r.ok) {
    const b = await (await fetch('/api/bankroll')).json();
    document.getElementById('s-bankroll').textContent = money(b.bankroll);
    return;
  }
  const p = await r.json();
  document.getElementById('s-bankroll').textContent = money(p.final_bankroll);
  document.getElementById('s-trades').textContent = p.total_trades;
  document.getElementById('s-winrate').textContent = (p.win_rate * 100).toFixed(1) + '%';
  const profit = document.getElementById('s-profit');
  profit.textContent = (p.total_profit >= 0 ? '+' : '') + money(p.total_profit);
  profit.className = 'value ' + (p.total_profit >= 0 ? 'pos' : 'neg');
  document.getElementById('s-roi').textContent = p.roi_pct.toFixed(2) + '%';
  document.getElementById('s-mdd').textContent = money(p.max_drawdown);
  drawChart(p.cumulative_profit, p.drawdown);
}

async function loadTrades() {
  const r = await fetch('/api/trades');
  if (!r.ok) return;
  const trades = await r.json();
  if (!trades.length) return;
  document.getElementById('trades-tbody').innerHTML = trades.slice().reverse().slice(0, 50).map(t => `<tr>
    <td>${t.id}</td><td>${t.match_name}</td><td>${t.market}</td><td>${t.book_odds.toFixed(2)}</td>
    <td>${money(t.stake_amount)}</td><td>${t.result}</td>
    <td class="${t.profit >= 0 ? 'pos' : 'neg'}">${money(t.profit)}</td><td>${money(t.bankroll_after)}</td>
  </tr>`).join('');
}

function drawChart(cumulative, drawdown) {
  const canvas = document.getElementById('pnl-chart');
  const ctx = canvas.getContext('2d');
  const W = canvas.width = canvas.parentElement.clientWidth - 32;
  const H = canvas.height = 200;
  ctx.clearRect(0, 0, W, H);
  if (cumulative.length < 2) return;
  const all = cumulative.concat(drawdown, [0]);
  const min = Math.min(...all), max = Math.max(...all), range = (max - min) || 1;
  const step = W / (cumulative.length - 1);
  const toY = v => H - ((v - min) / range) * H;

  ctx.strokeStyle = '#2a2d3a';
  ctx.beginPath(); ctx.moveTo(0, toY(0)); ctx.lineTo(W, toY(0)); ctx.stroke();

  ctx.fillStyle = 'rgba(255,79,106,0.3)';
  ctx.beginPath(); ctx.moveTo(0, toY(0));
  drawdown.forEach((v, i) => ctx.lineTo(i * step, toY(v)));
  ctx.lineTo(W, toY(0)); ctx.closePath(); ctx.fill();

  ctx.strokeStyle = '#6c63ff'; ctx.lineWidth = 2;
  ctx.beginPath();
  cumulative.forEach((v, i) => i === 0 ? ctx.moveTo(0, toY(v)) : ctx.lineTo(i * step, toY(v)));
  ctx.stroke();
}

async function loadAll() {
  await Promise.all([loadPerformance(), loadTrades()]);
  document.getElementById('last-updated').textContent = 'Updated ' + new Date().toLocaleTimeString();
}

loadAll();
setInterval(loadAll, 10000);
</script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[test]
    fn engine_errors_map_to_statuses() {
        let cases = [
            (EngineError::EmptyLedger, StatusCode::NOT_FOUND),
            (EngineError::Ledger("disk full".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                EngineError::BookOddsUnavailable("none".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                EngineError::ModelDegenerate("p_draw = 0".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn image_payload_accepts_raw_and_data_url() {
        let raw = STANDARD.encode(b"\xff\xd8jpeg");
        assert_eq!(decode_image(&raw).unwrap(), b"\xff\xd8jpeg");
        let data_url = format!("data:image/jpeg;base64,{}", raw);
        assert_eq!(decode_image(&data_url).unwrap(), b"\xff\xd8jpeg");
        assert!(matches!(decode_image("%%%"), Err(ApiError::BadRequest(_))));
    }
}
