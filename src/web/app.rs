use std::sync::Arc;

use async_graphql::{
    Context, EmptyMutation, EmptySubscription, Error, Schema, http::GraphiQLSource,
};
use async_graphql_poem::GraphQL;
use poem::{
    Endpoint, EndpointExt, Route, Server, get, handler,
    listener::TcpListener,
    middleware::{Cors, Tracing},
    web::Html,
};
use tracing::info;

use crate::{
    routing::RoutePlanner,
    structures::{LatLng, RouteMode, plan::PlanOutcome},
};

struct QueryRoot;

#[async_graphql::Object]
impl QueryRoot {
    async fn ping(&self) -> &str {
        "pong"
    }

    async fn route(
        &self,
        ctx: &Context<'_>,
        from_lat: f64,
        from_lng: f64,
        to_lat: f64,
        to_lng: f64,
        mode: RouteMode,
    ) -> Result<PlanOutcome, Error> {
        let planner = ctx.data::<Arc<RoutePlanner>>()?;

        let result = planner.find_route(
            LatLng::new(from_lat, from_lng),
            LatLng::new(to_lat, to_lng),
            mode,
        );
        Ok(PlanOutcome::from_result(planner.network(), mode, result))
    }

    /// Shortest, safest and hybrid routes between the same two points.
    async fn routes(
        &self,
        ctx: &Context<'_>,
        from_lat: f64,
        from_lng: f64,
        to_lat: f64,
        to_lng: f64,
    ) -> Result<Vec<PlanOutcome>, Error> {
        let planner = ctx.data::<Arc<RoutePlanner>>()?;

        info!("Calculating routes from ({from_lat}, {from_lng}) to ({to_lat}, {to_lng})");
        Ok(planner
            .find_routes(LatLng::new(from_lat, from_lng), LatLng::new(to_lat, to_lng))
            .into_iter()
            .map(|(mode, result)| PlanOutcome::from_result(planner.network(), mode, result))
            .collect())
    }
}

#[handler]
async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

#[handler]
async fn health() -> &'static str {
    "ok"
}

/// All routes, open to cross-origin callers, with one log line per request.
pub fn app(planner: Arc<RoutePlanner>) -> impl Endpoint {
    let schema = Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(planner)
        .finish();
    Route::new()
        .at("/graphql", GraphQL::new(schema))
        .at("/graphiql", get(graphiql))
        .at("/health", get(health))
        .with(Cors::new())
        .with(Tracing)
}

pub async fn server(planner: Arc<RoutePlanner>, bind: &str) -> std::io::Result<()> {
    info!("Serving on {bind}");
    Server::new(TcpListener::bind(bind.to_string()))
        .run(app(planner))
        .await
}

#[cfg(test)]
mod tests {
    use poem::test::TestClient;

    use super::*;
    use crate::structures::{NodeData, NodeID, RoadNetwork, RoutingParameters};

    fn planner() -> Arc<RoutePlanner> {
        let mut g = RoadNetwork::new();
        g.add_node(NodeData {
            eid: 100,
            lat_lng: LatLng::new(51.5, -0.1),
        });
        g.add_node(NodeData {
            eid: 200,
            lat_lng: LatLng::new(51.5009, -0.1),
        });
        let e = g.add_edge(NodeID(0), NodeID(1), 100.0, None).unwrap();
        g.set_safety_cost(e, 2.5);
        Arc::new(RoutePlanner::new(g, RoutingParameters::default()))
    }

    #[tokio::test]
    async fn answers_ping() {
        let cli = TestClient::new(app(planner()));
        let resp = cli
            .post("/graphql")
            .content_type("application/json")
            .body(r#"{"query":"{ ping }"}"#)
            .send()
            .await;
        resp.assert_status_is_ok();
        let json = resp.json().await;
        json.value()
            .object()
            .get("data")
            .object()
            .get("ping")
            .assert_string("pong");
    }

    #[tokio::test]
    async fn returns_every_mode_with_errors_inline() {
        let cli = TestClient::new(app(planner()));
        let query = r#"{"query":"{ routes(fromLat: 51.5, fromLng: -0.1, toLat: 51.5009, toLng: -0.1) { mode plan { nodes totalDistance totalSafety } error } back: route(fromLat: 51.5009, fromLng: -0.1, toLat: 51.5, toLng: -0.1, mode: SAFEST) { mode plan { totalDistance } error } }"}"#;
        let resp = cli
            .post("/graphql")
            .content_type("application/json")
            .body(query)
            .send()
            .await;
        resp.assert_status_is_ok();

        let json = resp.json().await;
        let data = json.value().object().get("data").object();

        let routes = data.get("routes").array();
        routes.assert_len(3);
        let shortest = routes.get(0).object();
        shortest.get("mode").assert_string("SHORTEST");
        shortest.get("error").assert_null();
        let plan = shortest.get("plan").object();
        plan.get("totalDistance").assert_f64(100.0);
        plan.get("totalSafety").assert_f64(2.5);
        plan.get("nodes").array().assert_len(2);

        // The only edge is one-way.
        let back = data.get("back").object();
        back.get("mode").assert_string("SAFEST");
        back.get("plan").assert_null();
        back.get("error").assert_string("no safest route found");
    }

    #[tokio::test]
    async fn health_is_ok_for_cross_origin_callers() {
        let cli = TestClient::new(app(planner()));
        let resp = cli
            .get("/health")
            .header("Origin", "http://localhost:5173")
            .send()
            .await;
        resp.assert_status_is_ok();
        resp.assert_header_exist("access-control-allow-origin");
        resp.assert_text("ok").await;
    }
}
