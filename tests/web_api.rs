use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::thread;

use assert_approx_eq::assert_approx_eq;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use zssn::{Context, ContextConfigExt, ContextWebApiExt, PointWeights};

// Starts a ledger server on an ephemeral port and returns its base URL. The server thread
// lives until the test process exits.
fn start_server() -> String {
    let (addr_tx, addr_rx) = mpsc::channel::<SocketAddr>();
    thread::spawn(move || {
        let mut context = Context::new();
        context
            .set_point_weights(PointWeights {
                water: 4,
                food: 3,
                meds: 2,
                ammo: 1,
            })
            .unwrap();
        let addr = context
            .setup_web_api("127.0.0.1:0".parse().unwrap())
            .unwrap();
        addr_tx.send(addr).unwrap();
        context.run_web_api().unwrap();
    });
    format!("http://{}", addr_rx.recv().unwrap())
}

fn survivor(name: &str, water: u32, food: u32, meds: u32, ammo: u32) -> Value {
    json!({
        "name": name,
        "age": 33,
        "gender": "female",
        "latitude": -12.5,
        "longitude": 130.25,
        "inventory": {"water": water, "food": food, "meds": meds, "ammo": ammo},
    })
}

struct Api {
    base: String,
    client: Client,
}

impl Api {
    fn new() -> Api {
        Api {
            base: start_server(),
            client: Client::new(),
        }
    }

    fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(format!("{}{path}", self.base)).send().unwrap();
        let status = response.status();
        (status, response.json().unwrap_or(Value::Null))
    }

    fn post(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.base))
            .json(body)
            .send()
            .unwrap();
        let status = response.status();
        (status, response.json().unwrap_or(Value::Null))
    }

    fn patch(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        let response = self
            .client
            .patch(format!("{}{path}", self.base))
            .json(body)
            .send()
            .unwrap();
        let status = response.status();
        (status, response.json().unwrap_or(Value::Null))
    }

    fn register(&self, body: &Value) -> u64 {
        let (status, created) = self.post("/survivors", body);
        assert_eq!(status, StatusCode::CREATED, "{created}");
        created["id"].as_u64().unwrap()
    }

    fn report(&self, reporter: u64, reported: u64) -> (StatusCode, Value) {
        self.post(
            "/reports",
            &json!({"reporter": reporter, "reported": reported}),
        )
    }
}

#[test]
fn register_and_fetch_survivor() {
    let api = Api::new();
    let id = api.register(&survivor("Ann", 10, 5, 3, 8));

    let (status, body) = api.get(&format!("/survivors/{id}"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ann");
    assert_eq!(body["infected"], false);
    assert_eq!(body["inventory"]["ammo"], 8);

    let (status, body) = api.get("/survivors");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let inventory_id = body[0]["inventory"]["id"].as_u64().unwrap();
    let (status, inventory) = api.get(&format!("/inventories/{inventory_id}"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inventory["owner_survivor"], id);
}

#[test]
fn registration_rejects_bad_input() {
    let api = Api::new();
    let mut body = survivor("Ann", 1, 1, 1, 1);
    body["infected"] = json!(true);
    let (status, error) = api.post("/survivors", &body);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation_error");

    let mut body = survivor("Ann", 1, 1, 1, 1);
    body["latitude"] = json!(91.0);
    let (status, _) = api.post("/survivors", &body);
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = api
        .client
        .post(format!("{}/survivors", api.base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, survivors) = api.get("/survivors");
    assert!(survivors.as_array().unwrap().is_empty());
}

#[test]
fn three_reports_infect_and_lock_out() {
    let api = Api::new();
    let target = api.register(&survivor("Target", 10, 10, 10, 10));
    let reporters: Vec<u64> = (0..3)
        .map(|i| api.register(&survivor(&format!("R{i}"), 1, 1, 1, 1)))
        .collect();

    let (status, _) = api.report(reporters[0], target);
    assert_eq!(status, StatusCode::CREATED);
    let (status, error) = api.report(reporters[0], target);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "duplicate_report");

    api.report(reporters[1], target);
    let (status, _) = api.get(&format!("/survivors/{target}"));
    assert_eq!(status, StatusCode::OK);

    api.report(reporters[2], target);
    let (status, error) = api.get(&format!("/survivors/{target}"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "infected_access");

    let (status, _) = api.patch(
        &format!("/survivors/{target}"),
        &json!({"latitude": 1.0, "longitude": 1.0}),
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Still listed, and still infected.
    let (_, survivors) = api.get("/survivors");
    let listed = survivors
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == target)
        .unwrap()
        .clone();
    assert_eq!(listed["infected"], true);
    assert_eq!(listed["latitude"], -12.5);

    // An infected survivor cannot file reports.
    let (status, error) = api.report(target, reporters[0]);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "reporter_infected");

    let (_, reports) = api.get("/reports");
    assert_eq!(reports.as_array().unwrap().len(), 3);
}

#[test]
fn balanced_trade_and_rejections() {
    let api = Api::new();
    let a = api.register(&survivor("A", 10, 10, 10, 10));
    let b = api.register(&survivor("B", 10, 10, 10, 10));

    let trade = json!({
        "trader_1": {"id": a, "trd_water": 3, "trd_food": 1, "trd_meds": 3, "trd_ammo": 1},
        "trader_2": {"id": b, "trd_water": 1, "trd_food": 4, "trd_meds": 1, "trd_ammo": 4},
    });
    let (status, inventories) = api.post("/survivors/trade", &trade);
    assert_eq!(status, StatusCode::OK, "{inventories}");
    assert_eq!(inventories[0]["owner_survivor"], a);
    assert_eq!(inventories[0]["water"], 10 - 3 + 1);
    assert_eq!(inventories[1]["owner_survivor"], b);
    assert_eq!(inventories[1]["ammo"], 10 - 4 + 1);

    let unbalanced = json!({
        "trader1": {"id": a, "trd_water": 1},
        "trader2": {"id": b, "trd_ammo": 1},
    });
    let (status, error) = api.post("/survivors/trade", &unbalanced);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "unbalanced_trade");

    let too_much = json!({
        "trader1": {"id": a, "trd_water": 20},
        "trader2": {"id": b, "trd_ammo": 80},
    });
    let (status, error) = api.post("/survivors/trade", &too_much);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "insufficient_inventory");

    // Rejected trades left everything as the first trade did.
    let (_, inventories) = api.get("/inventories");
    assert_eq!(inventories[0]["water"], 8);
    assert_eq!(inventories[1]["water"], 12);
}

#[test]
fn fleet_report() {
    let api = Api::new();
    let (status, error) = api.get("/survivors/record");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "empty_fleet");

    let ids: Vec<u64> = (0..4)
        .map(|i| api.register(&survivor(&format!("S{i}"), 10, 2, 0, 0)))
        .collect();
    for reporter in &ids[1..] {
        api.report(*reporter, ids[0]);
    }

    let (status, record) = api.get("/survivors/record");
    assert_eq!(status, StatusCode::OK);
    assert_approx_eq!(record["infected_percent"].as_f64().unwrap(), 25.0);
    assert_approx_eq!(record["survivors_percent"].as_f64().unwrap(), 75.0);
    assert_approx_eq!(record["avg_water"].as_f64().unwrap(), 10.0);
    assert_approx_eq!(record["points_lost"].as_f64().unwrap(), 46.0);
}

#[test]
fn remove_survivor_and_unsupported_methods() {
    let api = Api::new();
    let a = api.register(&survivor("A", 1, 1, 1, 1));
    let b = api.register(&survivor("B", 1, 1, 1, 1));
    api.report(a, b);

    let response = api
        .client
        .delete(format!("{}/survivors/{a}", api.base))
        .send()
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let (status, _) = api.get(&format!("/survivors/{a}"));
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, reports) = api.get("/reports");
    assert!(reports.as_array().unwrap().is_empty());

    let (status, error) = api.post("/inventories", &json!({}));
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error["error"], "method_not_allowed");
    let response = api
        .client
        .delete(format!("{}/reports/0", api.base))
        .send()
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let error: Value = response.json().unwrap();
    assert_eq!(error["error"], "method_not_allowed");
    assert!(error["message"].as_str().unwrap().contains("DELETE"));

    let response = api
        .client
        .put(format!("{}/survivors/{b}", api.base))
        .json(&json!({}))
        .send()
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let error: Value = response.json().unwrap();
    assert_eq!(error["error"], "method_not_allowed");

    let (status, error) = api.get("/nope");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "not_found");
    assert_eq!(error["message"], "No route for /nope");
}

#[test]
fn concurrent_reports_are_counted_once() {
    let api = Arc::new(Api::new());
    let target = api.register(&survivor("Target", 1, 1, 1, 1));
    let reporters: Vec<u64> = (0..20)
        .map(|i| api.register(&survivor(&format!("R{i}"), 1, 1, 1, 1)))
        .collect();

    // Every reporter files the same report three times, all at once.
    let handles: Vec<_> = reporters
        .iter()
        .flat_map(|&reporter| std::iter::repeat_n(reporter, 3))
        .map(|reporter| {
            let api = Arc::clone(&api);
            thread::spawn(move || api.report(reporter, target).0)
        })
        .collect();
    let statuses: Vec<StatusCode> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let created = statuses.iter().filter(|&&s| s == StatusCode::CREATED).count();
    let duplicates = statuses
        .iter()
        .filter(|&&s| s == StatusCode::BAD_REQUEST)
        .count();
    assert_eq!(created, reporters.len());
    assert_eq!(duplicates, 2 * reporters.len());

    let (_, reports) = api.get("/reports");
    assert_eq!(reports.as_array().unwrap().len(), reporters.len());
    let (_, survivors) = api.get("/survivors");
    let infected: Vec<&Value> = survivors
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["infected"] == true)
        .collect();
    assert_eq!(infected.len(), 1);
    assert_eq!(infected[0]["id"], target);
}

#[test]
fn concurrent_trades_conserve_supplies() {
    let api = Arc::new(Api::new());
    let a = api.register(&survivor("A", 5, 5, 5, 5));
    let b = api.register(&survivor("B", 5, 5, 5, 5));

    // One water (4 points) for four ammo (4 points), far more often than A can afford.
    let handles: Vec<_> = (0..12)
        .map(|_| {
            let api = Arc::clone(&api);
            thread::spawn(move || {
                let trade = json!({
                    "trader1": {"id": a, "trd_water": 1},
                    "trader2": {"id": b, "trd_ammo": 4},
                });
                api.post("/survivors/trade", &trade).0
            })
        })
        .collect();
    let accepted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&s| s == StatusCode::OK)
        .count();
    // B is out of ammo after the first trade.
    assert_eq!(accepted, 1);

    let (_, inventories) = api.get("/inventories");
    let inventories = inventories.as_array().unwrap();
    for resource in ["water", "food", "meds", "ammo"] {
        let total: u64 = inventories
            .iter()
            .map(|inventory| inventory[resource].as_u64().unwrap())
            .sum();
        assert_eq!(total, 10, "{resource}");
    }
    assert_eq!(inventories[0]["water"], 5 - 1);
    assert_eq!(inventories[1]["ammo"], 5 - 4);
}
