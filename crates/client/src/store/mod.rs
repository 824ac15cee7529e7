//! Remote document store gateway.
//!
//! The store is a hierarchical JSON database addressed by path. Every read
//! is `GET {base}/{path}.json` and every write is `PUT` of the whole
//! document at that path. When a [`Session`] is passed the bearer token is
//! appended as `?auth=`; without one the same URL is requested anonymously.
//!
//! # Collections
//!
//! | Path                               | Document              |
//! |------------------------------------|-----------------------|
//! | `Cities`                           | [`City`] map          |
//! | `TimeSlots`                        | [`TimeSlot`] map      |
//! | `Foods`                            | [`Food`] map          |
//! | `Users/{uid}`                      | [`UserProfile`]       |
//! | `DeliveryAddresses/{uid}/{id}`     | [`DeliveryAddress`]   |
//! | `Orders/{id}`                      | [`Order`]             |

mod error;
mod orders;

pub use error::StoreError;
pub use orders::{LineRequest, OrderBuildError, OrderSelection, build_order};

#[cfg(test)]
pub(crate) use orders::tests as tests_support;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use tuckbox_core::{
    City, DeliveryAddress, Food, Order, OrderId, OrderTimestamp, TimeSlot, UserId, UserProfile,
    orders_for_user,
};
use url::Url;

use crate::auth::Session;
use crate::config::StoreConfig;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

const CITIES: &str = "Cities";
const TIME_SLOTS: &str = "TimeSlots";
const FOODS: &str = "Foods";
const USERS: &str = "Users";
const ADDRESSES: &str = "DeliveryAddresses";
const ORDERS: &str = "Orders";

/// What a collection read does when the store refuses or the body is bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Return the error.
    Raise,
    /// Log it and return an empty collection.
    Empty,
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────────────────────────────────────

/// Typed access to the remote store.
#[derive(Clone)]
pub struct RemoteDataGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl RemoteDataGateway {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, config: &StoreConfig) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                transport,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            }),
        }
    }

    /// `{base}/{path}.json`, plus `?auth={token}` iff a session is given.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidUrl` if the result does not parse.
    pub fn resource_url(&self, path: &str, session: Option<&Session>) -> Result<Url, StoreError> {
        let mut url = Url::parse(&format!("{}/{path}.json", self.inner.base_url))?;
        if let Some(session) = session {
            url.query_pairs_mut()
                .append_pair("auth", session.bearer_token().expose_secret());
        }
        Ok(url)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reference data
    // ─────────────────────────────────────────────────────────────────────────

    /// All delivery cities, keyed by store key.
    ///
    /// # Errors
    ///
    /// Returns any transport, status or decode failure.
    pub async fn get_cities(
        &self,
        session: Option<&Session>,
    ) -> Result<BTreeMap<String, City>, StoreError> {
        self.read_collection(CITIES, session, FailureMode::Raise)
            .await
    }

    /// All delivery windows. Empty if the store cannot be read.
    pub async fn get_time_slots(&self, session: Option<&Session>) -> BTreeMap<String, TimeSlot> {
        self.read_collection(TIME_SLOTS, session, FailureMode::Empty)
            .await
            .unwrap_or_default()
    }

    /// The menu. Empty if the store cannot be read.
    pub async fn get_foods(&self, session: Option<&Session>) -> BTreeMap<String, Food> {
        self.read_collection(FOODS, session, FailureMode::Empty)
            .await
            .unwrap_or_default()
    }

    /// Read a keyed collection.
    ///
    /// A `null` body is an empty collection. Entries that do not decode are
    /// logged and left out.
    ///
    /// # Errors
    ///
    /// With `FailureMode::Raise`, returns any transport, status or decode
    /// failure. With `FailureMode::Empty`, never fails.
    #[instrument(skip(self, session), fields(authenticated = session.is_some()))]
    pub async fn read_collection<T: DeserializeOwned>(
        &self,
        path: &str,
        session: Option<&Session>,
        mode: FailureMode,
    ) -> Result<BTreeMap<String, T>, StoreError> {
        let result = async {
            let body = self.read_document(path, session).await?;
            decode_collection(path, body)
        }
        .await;

        match (result, mode) {
            (Ok(map), _) => Ok(map),
            (Err(e), FailureMode::Raise) => Err(e),
            (Err(e), FailureMode::Empty) => {
                warn!(path, error = %e, "collection unavailable, using empty");
                Ok(BTreeMap::new())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-user data
    // ─────────────────────────────────────────────────────────────────────────

    /// The user's saved delivery addresses.
    ///
    /// # Errors
    ///
    /// Returns `ScopeMismatch` if `session` is not `user_id`'s, or any
    /// transport, status or decode failure.
    pub async fn get_user_addresses(
        &self,
        session: &Session,
        user_id: &UserId,
    ) -> Result<BTreeMap<String, DeliveryAddress>, StoreError> {
        let uid = owned_key(session, user_id)?;
        self.read_collection(&format!("{ADDRESSES}/{uid}"), Some(session), FailureMode::Raise)
            .await
    }

    /// Create or replace an address. Idempotent: keyed by the address id.
    ///
    /// # Errors
    ///
    /// Returns `ScopeMismatch` if the session or the address belongs to
    /// someone other than `user_id`, or any transport/status failure.
    pub async fn upsert_user_address(
        &self,
        session: &Session,
        user_id: &UserId,
        address: &DeliveryAddress,
    ) -> Result<(), StoreError> {
        let uid = owned_key(session, user_id)?;
        if &address.owner != user_id {
            return Err(StoreError::ScopeMismatch);
        }
        let id = key(address.id.as_str())?;
        self.write_document(&format!("{ADDRESSES}/{uid}/{id}"), Some(session), address)
            .await
    }

    /// The user's profile, or `None` if none has been written.
    ///
    /// # Errors
    ///
    /// Returns `ScopeMismatch` if `session` is not `user_id`'s, or any
    /// transport, status or decode failure.
    pub async fn get_user_profile(
        &self,
        session: &Session,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, StoreError> {
        let uid = owned_key(session, user_id)?;
        let path = format!("{USERS}/{uid}");
        let body = self.read_document(&path, Some(session)).await?;
        if body.is_null() {
            return Ok(None);
        }
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                path,
                reason: e.to_string(),
            })
    }

    /// Create or replace the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `ScopeMismatch` if the profile is not the session user's, or
    /// any transport/status failure.
    pub async fn upsert_user_profile(
        &self,
        session: &Session,
        profile: &UserProfile,
    ) -> Result<(), StoreError> {
        let uid = owned_key(session, &profile.user_id)?;
        self.write_document(&format!("{USERS}/{uid}"), Some(session), profile)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Orders
    // ─────────────────────────────────────────────────────────────────────────

    /// Build and write a new order. Returns the written document.
    ///
    /// `created_at` is the business-local creation time; no clock is read
    /// here and the cutoff is not checked here.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Order` if the order is refused before writing,
    /// `ScopeMismatch` if a session is given for another user, or any
    /// transport/status failure from the write.
    #[instrument(skip_all, fields(user_id = %user_id, lines = lines.len()))]
    pub async fn place_order(
        &self,
        session: Option<&Session>,
        user_id: &UserId,
        selection: &OrderSelection,
        lines: &[LineRequest],
        created_at: OrderTimestamp,
    ) -> Result<Order, StoreError> {
        if let Some(session) = session
            && session.user_id() != user_id
        {
            return Err(StoreError::ScopeMismatch);
        }

        let order = build_order(OrderId::generate(), user_id, selection, lines, created_at)?;
        let id = key(order.id.as_str())?;
        self.write_document(&format!("{ORDERS}/{id}"), session, &order)
            .await?;

        debug!(order_id = %order.id, total = %order.total_price, "order written");
        Ok(order)
    }

    /// Every order placed by `user_id`.
    ///
    /// Reads the whole `Orders` collection and filters locally.
    ///
    /// # Errors
    ///
    /// Returns any transport, status or decode failure.
    pub async fn get_orders_for_user(
        &self,
        session: Option<&Session>,
        user_id: &UserId,
    ) -> Result<BTreeMap<String, Order>, StoreError> {
        let all: BTreeMap<String, Order> = self
            .read_collection(ORDERS, session, FailureMode::Raise)
            .await?;
        Ok(orders_for_user(&all, user_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Raw document access
    // ─────────────────────────────────────────────────────────────────────────

    async fn read_document(
        &self,
        path: &str,
        session: Option<&Session>,
    ) -> Result<serde_json::Value, StoreError> {
        let url = self.resource_url(path, session)?;
        let response = self.inner.transport.send(HttpRequest::get(url)).await?;
        debug!(path, status = %response.status, "store read");
        let response = check_status(path, response)?;

        serde_json::from_str(&response.body).map_err(|e| StoreError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn write_document<T: Serialize + Sync>(
        &self,
        path: &str,
        session: Option<&Session>,
        document: &T,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_value(document).map_err(|e| StoreError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let url = self.resource_url(path, session)?;
        let response = self
            .inner
            .transport
            .send(HttpRequest::put_json(url, body))
            .await?;
        debug!(path, status = %response.status, "store write");
        check_status(path, response).map(|_| ())
    }
}

/// Run `op`; if it is refused as unauthorized, wait `delay` and run it once
/// more.
///
/// A freshly issued token can take a moment to be honoured by the store.
///
/// # Errors
///
/// Returns the error from the second attempt, or the first error if it was
/// not an authorization failure.
pub async fn recheck_once<T, F, Fut>(delay: Duration, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    match op().await {
        Err(e) if e.is_unauthorized() => {
            debug!(error = %e, ?delay, "store refused fresh token, retrying once");
            tokio::time::sleep(delay).await;
            op().await
        }
        other => other,
    }
}

fn check_status(path: &str, response: HttpResponse) -> Result<HttpResponse, StoreError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(StoreError::Rejected {
            path: path.to_string(),
            status: response.status,
        })
    }
}

/// Validate a single path segment.
fn key(segment: &str) -> Result<&str, StoreError> {
    const FORBIDDEN: &[char] = &['/', '.', '#', '$', '[', ']'];
    if segment.trim().is_empty() || segment.contains(FORBIDDEN) {
        return Err(StoreError::InvalidKey(segment.to_string()));
    }
    Ok(segment)
}

/// The user's key, provided the session is theirs.
fn owned_key<'a>(session: &Session, user_id: &'a UserId) -> Result<&'a str, StoreError> {
    if session.user_id() != user_id {
        return Err(StoreError::ScopeMismatch);
    }
    key(user_id.as_str())
}

/// Decode a collection body.
///
/// The store returns keyed children as an object, except when all keys are
/// small integers, where it returns an array with `null` holes.
fn decode_collection<T: DeserializeOwned>(
    path: &str,
    body: serde_json::Value,
) -> Result<BTreeMap<String, T>, StoreError> {
    let entries: Vec<(String, serde_json::Value)> = match body {
        serde_json::Value::Null => return Ok(BTreeMap::new()),
        serde_json::Value::Object(map) => map.into_iter().collect(),
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        other => {
            return Err(StoreError::Malformed {
                path: path.to_string(),
                reason: format!("expected a collection, got {other}"),
            });
        }
    };

    let mut out = BTreeMap::new();
    for (key, value) in entries {
        match serde_json::from_value(value) {
            Ok(entity) => {
                out.insert(key, entity);
            }
            Err(e) => warn!(path, key = %key, error = %e, "skipping malformed entry"),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Utc;
    use reqwest::{Method, StatusCode};
    use secrecy::SecretString;
    use tuckbox_core::{AddressId, Money};

    use super::orders::tests::{food, selection};
    use super::*;
    use crate::config::tests::test_config;
    use crate::transport::RequestBody;
    use crate::transport::mock::MockTransport;

    fn gateway(mock: &Arc<MockTransport>) -> RemoteDataGateway {
        let transport: Arc<dyn HttpTransport> = mock.clone();
        RemoteDataGateway::new(transport, &test_config().store)
    }

    fn session(uid: &str, token: &str) -> Session {
        Session::new(UserId::new(uid), SecretString::from(token.to_string()), Utc::now()).unwrap()
    }

    fn timestamp() -> OrderTimestamp {
        OrderTimestamp::new("04/05/2026 09:30:00")
    }

    #[test]
    fn test_auth_param_iff_session() {
        let mock = Arc::new(MockTransport::new());
        let gw = gateway(&mock);

        let public = gw.resource_url("Cities", None).unwrap();
        assert_eq!(public.as_str(), "https://db.test/Cities.json");
        assert!(public.query().is_none());

        let private = gw
            .resource_url("Users/u1", Some(&session("u1", "t1")))
            .unwrap();
        assert_eq!(private.as_str(), "https://db.test/Users/u1.json?auth=t1");
    }

    #[tokio::test]
    async fn test_null_collection_is_empty() {
        let mock = Arc::new(MockTransport::new().on(Method::GET, "/Cities.json", 200, "null"));
        let cities = gateway(&mock).get_cities(None).await.unwrap();
        assert!(cities.is_empty());
    }

    #[tokio::test]
    async fn test_array_collection_skips_holes() {
        let body = r#"[null, {"City_ID":"c1","City_Name":"North"}, {"City_ID":"c2","City_Name":"South"}]"#;
        let mock = Arc::new(MockTransport::new().on(Method::GET, "/Cities.json", 200, body));
        let cities = gateway(&mock).get_cities(None).await.unwrap();
        assert_eq!(cities.len(), 2);
        assert_eq!(cities["1"].name, "North");
    }

    #[tokio::test]
    async fn test_failure_modes() {
        let mock = Arc::new(
            MockTransport::new()
                .on(Method::GET, "/Cities.json", 401, "")
                .on(Method::GET, "/TimeSlots.json", 401, "")
                .fail(Method::GET, "/Foods.json"),
        );
        let gw = gateway(&mock);

        let err = gw.get_cities(None).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(gw.get_time_slots(None).await.is_empty());
        assert!(gw.get_foods(None).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_entry_is_skipped() {
        let body = r#"{
            "f1": {"Food_ID":"f1","Food_Name":"Burger","Price":8.5},
            "f2": {"Food_ID":"f2","Food_Name":"Broken"}
        }"#;
        let mock = Arc::new(MockTransport::new().on(Method::GET, "/Foods.json", 200, body));
        let foods = gateway(&mock).get_foods(None).await;
        assert_eq!(foods.len(), 1);
        assert_eq!(foods["f1"].unit_price, Money::from_cents(850));
    }

    #[tokio::test]
    async fn test_place_order_writes_one_document() {
        let mock = Arc::new(MockTransport::new().on(Method::PUT, "/Orders/", 200, "{}"));
        let gw = gateway(&mock);
        let s = session("u1", "t1");
        let lines = [LineRequest::new(food("f1", "Burger", 850), 2, None)];

        let order = gw
            .place_order(Some(&s), s.user_id(), &selection("u1"), &lines, timestamp())
            .await
            .unwrap();

        assert_eq!(order.total_price, Money::from_cents(1700));
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].url.path(),
            format!("/Orders/{}.json", order.id.as_str())
        );
        assert_eq!(calls[0].url.query(), Some("auth=t1"));
        let RequestBody::Json(body) = &calls[0].body else {
            panic!("expected JSON body");
        };
        assert_eq!(body["Total_Price"], serde_json::json!(17.0));
        assert_eq!(body["Items"]["item_000"]["Line_Total"], serde_json::json!(17.0));
        assert_eq!(body["Order_Date"], "04/05/2026 09:30:00");
    }

    #[tokio::test]
    async fn test_place_order_with_no_items_writes_nothing() {
        let mock = Arc::new(MockTransport::new().on(Method::PUT, "/Orders/", 200, "{}"));
        let gw = gateway(&mock);
        let s = session("u1", "t1");
        let lines = [LineRequest::new(food("f1", "Burger", 850), 0, None)];

        let err = gw
            .place_order(Some(&s), s.user_id(), &selection("u1"), &lines, timestamp())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Order(OrderBuildError::NoItems)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_with_overflowing_total_writes_nothing() {
        let mock = Arc::new(MockTransport::new().on(Method::PUT, "/Orders/", 200, "{}"));
        let gw = gateway(&mock);
        let s = session("u1", "t1");
        let mut pricey = food("f9", "Truffle", 100);
        pricey.unit_price = serde_json::from_str("50000000000000000000000000000").unwrap();
        let lines = [LineRequest::new(pricey, 2, None)];

        let err = gw
            .place_order(Some(&s), s.user_id(), &selection("u1"), &lines, timestamp())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Order(OrderBuildError::TotalOverflow)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_rejected_write_is_error() {
        let mock = Arc::new(MockTransport::new().on(Method::PUT, "/Orders/", 403, ""));
        let gw = gateway(&mock);
        let lines = [LineRequest::new(food("f1", "Burger", 850), 1, None)];

        let result = gw
            .place_order(None, &UserId::new("u1"), &selection("u1"), &lines, timestamp())
            .await;

        assert!(matches!(
            result,
            Err(StoreError::Rejected { status, .. }) if status == StatusCode::FORBIDDEN
        ));
        assert!(mock.calls()[0].url.query().is_none());
    }

    #[tokio::test]
    async fn test_orders_for_user_filters_scan() {
        let body = r#"{
            "o1": {"Order_ID":"o1","Order_Date":"01/02/2026 09:00:00","User_ID":"u1","City_ID":"c1","Time_Slot_ID":"s1","Address_ID":"a1","Total_Price":8.5},
            "o2": {"Order_ID":"o2","Order_Date":"01/02/2026 09:05:00","User_ID":"u2","City_ID":"c1","Time_Slot_ID":"s1","Address_ID":"a2","Total_Price":4.0}
        }"#;
        let mock = Arc::new(MockTransport::new().on(Method::GET, "/Orders.json", 200, body));
        let s = session("u1", "t1");

        let mine = gateway(&mock)
            .get_orders_for_user(Some(&s), s.user_id())
            .await
            .unwrap();

        assert_eq!(mine.len(), 1);
        assert!(mine.contains_key("o1"));
    }

    #[tokio::test]
    async fn test_addresses_are_scoped_to_session_user() {
        let mock = Arc::new(
            MockTransport::new()
                .on(Method::GET, "/DeliveryAddresses/u1.json", 200, "null")
                .on(Method::PUT, "/DeliveryAddresses/u1/", 200, "{}"),
        );
        let gw = gateway(&mock);
        let s = session("u1", "t1");

        let other = UserId::new("u2");
        assert!(matches!(
            gw.get_user_addresses(&s, &other).await,
            Err(StoreError::ScopeMismatch)
        ));
        assert!(gw.get_user_addresses(&s, s.user_id()).await.unwrap().is_empty());

        let address = DeliveryAddress {
            id: AddressId::new("a9"),
            owner: UserId::new("u1"),
            text: "1 Queen St".to_string(),
        };
        gw.upsert_user_address(&s, s.user_id(), &address)
            .await
            .unwrap();
        gw.upsert_user_address(&s, s.user_id(), &address)
            .await
            .unwrap();
        assert_eq!(mock.count(&Method::PUT, "/DeliveryAddresses/u1/a9.json"), 2);

        let foreign = DeliveryAddress {
            owner: other,
            ..address
        };
        assert!(matches!(
            gw.upsert_user_address(&s, s.user_id(), &foreign).await,
            Err(StoreError::ScopeMismatch)
        ));
    }

    #[tokio::test]
    async fn test_missing_profile_is_none() {
        let mock = Arc::new(MockTransport::new().on(Method::GET, "/Users/u1.json", 200, "null"));
        let s = session("u1", "t1");
        let profile = gateway(&mock)
            .get_user_profile(&s, s.user_id())
            .await
            .unwrap();
        assert!(profile.is_none());
    }

    #[test]
    fn test_key_rejects_path_characters() {
        assert!(key("abc123").is_ok());
        assert!(key("").is_err());
        assert!(key("a/b").is_err());
        assert!(key("..").is_err());
    }

    #[tokio::test]
    async fn test_recheck_once_retries_unauthorized_once() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result: Result<u32, StoreError> = recheck_once(Duration::ZERO, || async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(StoreError::Rejected {
                    path: "Users/u1".to_string(),
                    status: StatusCode::UNAUTHORIZED,
                })
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_recheck_once_gives_up_after_second_failure() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result: Result<(), StoreError> = recheck_once(Duration::ZERO, || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Rejected {
                path: "Users/u1".to_string(),
                status: StatusCode::FORBIDDEN,
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_recheck_once_does_not_retry_other_errors() {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let result: Result<(), StoreError> = recheck_once(Duration::ZERO, || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::InvalidKey(String::new()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
