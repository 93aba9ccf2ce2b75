//! Web server for the meteopipe dashboard.
//!
//! Read-only consumer of `weather.weather_data`:
//! - Axum for the HTTP server
//! - HTMX for fragment polling without heavy JavaScript
//! - Chart.js (CDN) for the temperature/humidity time-series
//!
//! The dashboard polls the sink on a fixed refresh interval and never
//! mutates it. An empty table renders an explicit empty state.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use crate::config::DbConfig;
use crate::db;
use crate::models::WeatherRecord;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Dashboard refresh interval, seconds
    pub refresh_secs: u64,
    /// Chart window, hours
    pub window_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            refresh_secs: 120,
            window_hours: 24,
        }
    }
}

/// Row cap for the chart/table queries, regardless of window.
const MAX_ROWS: i64 = 1000;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    config: ServerConfig,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/readings/latest", get(latest_handler))
        .route("/readings/table", get(table_handler))
        .route("/api/readings", get(api_readings_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
///
/// Fails fast (startup error, non-zero exit) if the sink is unreachable.
pub async fn run_server(config: ServerConfig, db_config: DbConfig) -> anyhow::Result<()> {
    let pool = db::connect_pool(&db_config).await?;
    db::ping(&pool).await?;

    // Tolerate starting before the first pipeline run
    let mut conn = pool.acquire().await?;
    db::ensure_schema(&mut conn).await?;
    drop(conn);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("meteopipe dashboard starting at http://{}", addr);

    let state = AppState { pool, config };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the HTML UI with the configured intervals
/// substituted in.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let html = INDEX_HTML
        .replace("__REFRESH_SECS__", &state.config.refresh_secs.to_string())
        .replace("__WINDOW_HOURS__", &state.config.window_hours.to_string());
    Html(html)
}

/// Current-conditions card fragment (HTMX polled).
async fn latest_handler(State(state): State<AppState>) -> Html<String> {
    match db::latest_record(&state.pool).await {
        Ok(Some(record)) => Html(format_latest_html(&record)),
        Ok(None) => Html(EMPTY_STATE_HTML.to_string()),
        Err(e) => {
            tracing::warn!("latest reading query failed: {}", e);
            Html(r#"<div class="error">Failed to query readings</div>"#.to_string())
        }
    }
}

/// Recent-readings table fragment (HTMX polled), newest first.
async fn table_handler(State(state): State<AppState>) -> Html<String> {
    let since = Utc::now() - Duration::hours(state.config.window_hours);
    match db::recent_records(&state.pool, since, MAX_ROWS).await {
        Ok(rows) if rows.is_empty() => Html(EMPTY_STATE_HTML.to_string()),
        Ok(rows) => Html(format_table_html(&rows)),
        Err(e) => {
            tracing::warn!("recent readings query failed: {}", e);
            Html(r#"<div class="error">Failed to query readings</div>"#.to_string())
        }
    }
}

/// Query parameters for the JSON readings endpoint.
#[derive(Debug, Deserialize)]
struct ReadingsParams {
    /// Window in hours (default: server config)
    hours: Option<i64>,

    /// Maximum rows returned
    limit: Option<i64>,
}

/// JSON readings endpoint, ascending by collection time for charting.
async fn api_readings_handler(
    State(state): State<AppState>,
    Query(params): Query<ReadingsParams>,
) -> Result<Json<Vec<WeatherRecord>>, (StatusCode, String)> {
    let hours = params.hours.unwrap_or(state.config.window_hours).max(1);
    let limit = params.limit.unwrap_or(MAX_ROWS).clamp(1, MAX_ROWS);
    let since = Utc::now() - Duration::hours(hours);

    db::recent_records(&state.pool, since, limit)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::warn!("readings query failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to query readings".to_string(),
            )
        })
}

/// Health check endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match db::ping(&state.pool).await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "sink unreachable"),
    }
}

// ============================================================================
// HTML rendering
// ============================================================================

/// Provider icon image URL for an icon code.
fn icon_url(icon: &str) -> String {
    format!("https://openweathermap.org/img/wn/{icon}@2x.png")
}

/// Format the current-conditions card.
fn format_latest_html(record: &WeatherRecord) -> String {
    let staleness = Utc::now().signed_duration_since(record.collection_timestamp);
    let age = if staleness.num_minutes() < 1 {
        "just now".to_string()
    } else if staleness.num_minutes() < 60 {
        format!("{} min ago", staleness.num_minutes())
    } else {
        format!("{} hr ago", staleness.num_hours())
    };

    format!(
        r#"<div class="hero-card">
  <div class="hero-main">
    <div>
      <h2 class="hero-city">{city}</h2>
      <p class="hero-country">{country}</p>
      <p class="hero-temp">{temp:.0}&deg;C</p>
      <p class="hero-desc">{description}</p>
    </div>
    <img class="hero-icon" src="{icon}" alt="{main}">
  </div>
  <div class="hero-metrics">
    <div class="metric"><span class="metric-label">Feels like</span><span class="metric-value">{feels:.0}&deg;C</span></div>
    <div class="metric"><span class="metric-label">Humidity</span><span class="metric-value">{humidity}%</span></div>
    <div class="metric"><span class="metric-label">Pressure</span><span class="metric-value">{pressure} hPa</span></div>
    <div class="metric"><span class="metric-label">Wind</span><span class="metric-value">{wind:.1} m/s @ {wind_dir}&deg;</span></div>
    <div class="metric"><span class="metric-label">Sunrise</span><span class="metric-value">{sunrise}</span></div>
    <div class="metric"><span class="metric-label">Sunset</span><span class="metric-value">{sunset}</span></div>
  </div>
  <p class="hero-updated">Collected {age}</p>
</div>"#,
        city = record.city,
        country = record.sys_country,
        temp = record.temperature_c,
        description = record.weather_description,
        icon = icon_url(&record.weather_icon),
        main = record.weather_main,
        feels = record.thermal_sensation_c,
        humidity = record.humidity,
        pressure = record.pressure,
        wind = record.wind_speed,
        wind_dir = record.wind_direction,
        sunrise = record.sys_sunrise.format("%H:%M UTC"),
        sunset = record.sys_sunset.format("%H:%M UTC"),
        age = age,
    )
}

/// Format the recent-readings table, newest first.
fn format_table_html(rows: &[WeatherRecord]) -> String {
    let mut html = String::from(
        r#"<table class="readings-table">
  <thead>
    <tr>
      <th>Collected (UTC)</th><th>City</th><th>Temp</th><th>Feels</th>
      <th>Humidity</th><th>Pressure</th><th>Wind</th><th>Conditions</th>
    </tr>
  </thead>
  <tbody>"#,
    );

    // Query order is ascending for the chart; the table reads newest first
    for record in rows.iter().rev().take(20) {
        html.push_str(&format!(
            r#"
    <tr>
      <td>{time}</td><td>{city}</td><td>{temp:.1}&deg;C</td><td>{feels:.1}&deg;C</td>
      <td>{humidity}%</td><td>{pressure} hPa</td><td>{wind:.1} m/s</td><td>{desc}</td>
    </tr>"#,
            time = record.collection_timestamp.format("%Y-%m-%d %H:%M:%S"),
            city = record.city,
            temp = record.temperature_c,
            feels = record.thermal_sensation_c,
            humidity = record.humidity,
            pressure = record.pressure,
            wind = record.wind_speed,
            desc = record.weather_description,
        ));
    }

    html.push_str("\n  </tbody>\n</table>");
    html
}

/// Shown when the sink has no rows yet.
const EMPTY_STATE_HTML: &str = r#"<div class="empty-state">
  <p class="empty-title">No readings yet</p>
  <p class="empty-desc">Waiting for the first pipeline run to land...</p>
</div>"#;

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>meteopipe — Weather Dashboard</title>

    <!-- HTMX -->
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>

    <!-- Chart.js -->
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js"></script>

    <style>
        :root {
            --bg-primary: #0f1419;
            --bg-card: #1a2129;
            --text-primary: #e6edf3;
            --text-secondary: #8b949e;
            --border: #2d333b;
            --accent: #58a6ff;
            --radius: 12px;
        }

        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
            min-height: 100vh;
        }

        .main { max-width: 960px; margin: 0 auto; padding: 2rem 1.25rem; }

        .section-title { font-size: 1.25rem; font-weight: 600; margin-bottom: 1rem; }
        .section { margin-bottom: 2rem; }

        .hero-card {
            background: var(--bg-card);
            border: 1px solid var(--border);
            border-radius: var(--radius);
            padding: 1.5rem;
        }

        .hero-main { display: flex; justify-content: space-between; align-items: center; }
        .hero-city { font-size: 1.5rem; }
        .hero-country { color: var(--text-secondary); font-size: 0.875rem; }
        .hero-temp { font-size: 3.5rem; font-weight: 700; line-height: 1.1; }
        .hero-desc { color: var(--text-secondary); text-transform: capitalize; }
        .hero-icon { width: 100px; height: 100px; }

        .hero-metrics {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(130px, 1fr));
            gap: 0.75rem;
            margin-top: 1.25rem;
            padding-top: 1.25rem;
            border-top: 1px solid var(--border);
        }

        .metric { display: flex; flex-direction: column; }
        .metric-label { color: var(--text-secondary); font-size: 0.75rem; }
        .metric-value { font-weight: 600; }

        .hero-updated { color: var(--text-secondary); font-size: 0.8125rem; margin-top: 1rem; }

        .chart-card {
            background: var(--bg-card);
            border: 1px solid var(--border);
            border-radius: var(--radius);
            padding: 1.25rem;
        }

        .readings-table {
            width: 100%;
            border-collapse: collapse;
            background: var(--bg-card);
            border: 1px solid var(--border);
            border-radius: var(--radius);
            overflow: hidden;
            font-size: 0.875rem;
        }

        .readings-table th, .readings-table td {
            padding: 0.5rem 0.75rem;
            text-align: left;
            border-bottom: 1px solid var(--border);
        }

        .readings-table th { color: var(--text-secondary); font-weight: 500; }
        .readings-table tr:last-child td { border-bottom: none; }

        .empty-state {
            background: var(--bg-card);
            border: 1px dashed var(--border);
            border-radius: var(--radius);
            padding: 2.5rem;
            text-align: center;
        }

        .empty-title { font-weight: 600; }
        .empty-desc { color: var(--text-secondary); font-size: 0.875rem; }

        .error {
            border: 1px solid #f85149;
            border-radius: var(--radius);
            padding: 1rem;
            color: #f85149;
        }

        .footer {
            border-top: 1px solid var(--border);
            padding: 1.25rem;
            text-align: center;
            font-size: 0.8125rem;
            color: var(--text-secondary);
        }

        .footer a { color: var(--text-secondary); }
    </style>
</head>
<body>
    <main class="main">
        <section class="section"
                 hx-get="/readings/latest"
                 hx-trigger="load, every __REFRESH_SECS__s">
            <div class="empty-state">
                <p class="empty-title">Loading current conditions...</p>
            </div>
        </section>

        <section class="section">
            <h2 class="section-title">Last __WINDOW_HOURS__ hours</h2>
            <div class="chart-card">
                <canvas id="trend-chart" height="90"></canvas>
            </div>
        </section>

        <section class="section">
            <h2 class="section-title">Recent readings</h2>
            <div hx-get="/readings/table"
                 hx-trigger="load, every __REFRESH_SECS__s">
                <div class="empty-state">
                    <p class="empty-title">Loading readings...</p>
                </div>
            </div>
        </section>
    </main>

    <footer class="footer">
        <p>Data from <a href="https://openweathermap.org/" target="_blank">OpenWeather</a> · meteopipe v0.1.0</p>
    </footer>

    <script>
        const REFRESH_MS = __REFRESH_SECS__ * 1000;
        const WINDOW_HOURS = __WINDOW_HOURS__;
        let chart = null;

        async function refreshChart() {
            try {
                const res = await fetch(`/api/readings?hours=${WINDOW_HOURS}`);
                if (!res.ok) return;
                const rows = await res.json();

                const labels = rows.map(r => new Date(r.collection_timestamp)
                    .toLocaleTimeString([], { hour: '2-digit', minute: '2-digit' }));
                const temps = rows.map(r => r.temperature_c);
                const humidity = rows.map(r => r.humidity);

                if (chart) {
                    chart.data.labels = labels;
                    chart.data.datasets[0].data = temps;
                    chart.data.datasets[1].data = humidity;
                    chart.update('none');
                    return;
                }

                chart = new Chart(document.getElementById('trend-chart'), {
                    type: 'line',
                    data: {
                        labels: labels,
                        datasets: [
                            {
                                label: 'Temperature (°C)',
                                data: temps,
                                borderColor: '#58a6ff',
                                backgroundColor: 'rgba(88, 166, 255, 0.1)',
                                tension: 0.3,
                                fill: true,
                                yAxisID: 'y'
                            },
                            {
                                label: 'Humidity (%)',
                                data: humidity,
                                borderColor: '#3fb950',
                                tension: 0.3,
                                yAxisID: 'y1'
                            }
                        ]
                    },
                    options: {
                        responsive: true,
                        interaction: { mode: 'index', intersect: false },
                        scales: {
                            y: { position: 'left', title: { display: true, text: '°C' } },
                            y1: {
                                position: 'right',
                                min: 0, max: 100,
                                grid: { drawOnChartArea: false },
                                title: { display: true, text: '%' }
                            }
                        }
                    }
                });
            } catch (e) {
                // Leave the last chart in place; the next poll retries.
            }
        }

        refreshChart();
        setInterval(refreshChart, REFRESH_MS);
    </script>
</body>
</html>
"##;
