use crate::workflow::runner::Runner;
use log::info;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use warp::{Filter, Rejection, Reply};

/// HTTP face of the positioning session consumed by the visualizer.
///
/// * `GET /devices` current device snapshot
/// * `GET /status` session summary
/// * `POST /start`, `POST /record/start`, `POST /record/stop` session signals
pub struct GuiBridge {
    runner: Arc<Runner>,
}

impl GuiBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self { runner }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let runner = self.runner.clone();
        let runner_filter = warp::any().map(move || runner.clone());

        let devices_route = warp::path("devices")
            .and(warp::path::end())
            .and(warp::get())
            .and(runner_filter.clone())
            .map(|runner: Arc<Runner>| warp::reply::json(&runner.devices()));

        let status_route = warp::path("status")
            .and(warp::path::end())
            .and(warp::get())
            .and(runner_filter.clone())
            .map(|runner: Arc<Runner>| warp::reply::json(&runner.status()));

        let start_route = warp::path("start")
            .and(warp::path::end())
            .and(warp::post())
            .and(runner_filter.clone())
            .map(|runner: Arc<Runner>| {
                let started = runner.start();
                warp::reply::json(&json!({"status": "ok", "started": started}))
            });

        let record_start_route = warp::path!("record" / "start")
            .and(warp::post())
            .and(runner_filter.clone())
            .map(|runner: Arc<Runner>| {
                runner.start_recording();
                warp::reply::json(&json!({"status": "ok", "recording": true}))
            });

        let record_stop_route = warp::path!("record" / "stop")
            .and(warp::post())
            .and(runner_filter)
            .map(|runner: Arc<Runner>| {
                runner.stop_recording();
                warp::reply::json(&json!({"status": "ok", "recording": false}))
            });

        devices_route
            .or(status_route)
            .or(start_route)
            .or(record_start_route)
            .or(record_stop_route)
    }

    pub async fn serve(self, address: SocketAddr) {
        info!("positioning bridge listening on {}", address);
        warp::serve(self.routes()).run(address).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gui_bridge::model::StatusModel;
    use crate::workflow::config::SimulatorConfig;
    use trackcore::device::decode_batch;
    use warp::http::StatusCode;

    fn bridge() -> GuiBridge {
        GuiBridge::new(Arc::new(Runner::new(SimulatorConfig::default())))
    }

    #[tokio::test]
    async fn devices_are_served_after_start() {
        let bridge = bridge();
        let routes = bridge.routes();

        let empty = warp::test::request()
            .method("GET")
            .path("/devices")
            .reply(&routes)
            .await;
        assert_eq!(empty.status(), StatusCode::OK);
        assert!(decode_batch(empty.body()).unwrap().is_empty());

        let started = warp::test::request()
            .method("POST")
            .path("/start")
            .reply(&routes)
            .await;
        assert_eq!(started.status(), StatusCode::OK);

        let devices = warp::test::request()
            .method("GET")
            .path("/devices")
            .reply(&routes)
            .await;
        assert_eq!(decode_batch(devices.body()).unwrap().len(), 6);
    }

    #[tokio::test]
    async fn record_signals_toggle_status() {
        let bridge = bridge();
        let routes = bridge.routes();

        warp::test::request()
            .method("POST")
            .path("/record/start")
            .reply(&routes)
            .await;
        let status = warp::test::request()
            .method("GET")
            .path("/status")
            .reply(&routes)
            .await;
        let model: StatusModel = serde_json::from_slice(status.body()).unwrap();
        assert!(model.recording);

        warp::test::request()
            .method("POST")
            .path("/record/stop")
            .reply(&routes)
            .await;
        assert!(!bridge.runner.status().recording);
    }

    #[tokio::test]
    async fn wrong_method_is_rejected() {
        let bridge = bridge();
        let response = warp::test::request()
            .method("GET")
            .path("/start")
            .reply(&bridge.routes())
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
