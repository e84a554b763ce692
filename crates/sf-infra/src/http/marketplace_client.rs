//! reqwest adapter for the marketplace REST API.
//!
//! Responses use a `{ message, success, data? }` envelope. Some endpoints put
//! their payload under `data`, others at the top level; both are accepted.

use std::time::Duration;

use anyhow::Context;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use sf_core::ids::{SellerId, ShopId};
use sf_core::onboarding::{AccountForm, OtpCode, PaymentChoice, ShopForm};
use sf_core::ports::{ApiError, MarketplaceApiPort, PaymentSetupOutcome, VerifiedSeller};
use sf_core::security::SecretString;
use sf_core::OnboardingConfig;

pub struct HttpMarketplaceApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMarketplaceApi {
    pub fn new(config: &OnboardingConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build marketplace HTTP client")?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: Option<&SecretString>,
        body: &B,
    ) -> RequestBuilder {
        with_token(self.client.post(self.url(path)), token).json(body)
    }

    /// Sends the request and returns the envelope payload, `Value::Null` when
    /// the server answered without a body.
    async fn send(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await.map_err(map_transport)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport)?;
        debug!(endpoint, status = %status, "marketplace response");

        let body = parse_body(&text);
        if !status.is_success() {
            let message = envelope_message(body.as_ref())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(map_status(status, message));
        }

        let body = match body {
            Some(body) => body,
            None if text.trim().is_empty() => return Ok(Value::Null),
            None => return Err(ApiError::Decode(format!("{endpoint}: response is not JSON"))),
        };
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let message = envelope_message(Some(&body)).unwrap_or_else(|| "request failed".to_string());
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        if let Some(data) = body.get("data").filter(|data| !data.is_null()) {
            return Ok(data.clone());
        }
        Ok(body)
    }

    async fn send_for<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let payload = self.send(endpoint, request).await?;
        serde_json::from_value(payload).map_err(|e| ApiError::Decode(format!("{endpoint}: {e}")))
    }
}

fn with_token(request: RequestBuilder, token: Option<&SecretString>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token.expose()),
        None => request,
    }
}

fn parse_body(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

fn envelope_message(body: Option<&Value>) -> Option<String> {
    body?
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn map_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else if let Some(status) = err.status() {
        map_status(status, err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

fn map_status(code: StatusCode, message: String) -> ApiError {
    match code {
        StatusCode::CONFLICT => ApiError::Conflict { message },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ApiError::Timeout,
        _ if code.is_server_error() => ApiError::Server {
            status: code.as_u16(),
            message,
        },
        _ => ApiError::Rejected {
            status: code.as_u16(),
            message,
        },
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegistrationRequest<'a> {
    name: &'a str,
    email: &'a str,
    phone_number: &'a str,
    country: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    otp: Option<&'a str>,
}

impl<'a> RegistrationRequest<'a> {
    fn new(account: &'a AccountForm, otp: Option<&'a OtpCode>) -> Self {
        Self {
            name: account.name.trim(),
            email: account.email.trim(),
            phone_number: account.phone_number.trim(),
            country: account.country.trim(),
            password: account.password.expose(),
            otp: otp.map(OtpCode::as_str),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateShopRequest<'a> {
    seller_id: &'a str,
    name: &'a str,
    bio: &'a str,
    address: &'a str,
    opening_hours: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<&'a str>,
    category: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupPaymentRequest<'a> {
    seller_id: &'a str,
    shop_id: &'a str,
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    account_holder: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bank_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    account_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    routing_number: Option<&'a str>,
}

impl<'a> SetupPaymentRequest<'a> {
    fn new(seller_id: &'a SellerId, shop_id: &'a ShopId, choice: &'a PaymentChoice) -> Self {
        let base = Self {
            seller_id: seller_id.as_str(),
            shop_id: shop_id.as_str(),
            method: "provider",
            provider: None,
            account_holder: None,
            bank_name: None,
            account_number: None,
            routing_number: None,
        };
        match choice {
            PaymentChoice::Provider { provider } => Self {
                provider: Some(provider.as_str()),
                ..base
            },
            PaymentChoice::Manual(bank) => Self {
                method: "manual",
                account_holder: Some(bank.account_holder.as_str()),
                bank_name: Some(bank.bank_name.as_str()),
                account_number: Some(bank.account_number.as_str()),
                routing_number: Some(bank.routing_number.as_str()),
                ..base
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShopRef<'a> {
    seller_id: &'a str,
    shop_id: &'a str,
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    otp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Deserialize)]
struct IdRef {
    id: String,
}

#[derive(Deserialize)]
struct VerifySellerResponse {
    seller: IdRef,
    token: String,
}

#[derive(Deserialize)]
struct CreateShopResponse {
    shop: IdRef,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentStatusResponse {
    is_payment_setup: bool,
}

#[async_trait::async_trait]
impl MarketplaceApiPort for HttpMarketplaceApi {
    async fn send_registration_otp(&self, account: &AccountForm) -> Result<(), ApiError> {
        let request = self.post("/seller-registration", None, &RegistrationRequest::new(account, None));
        self.send("seller-registration", request).await.map(drop)
    }

    async fn verify_registration_otp(
        &self,
        account: &AccountForm,
        code: &OtpCode,
    ) -> Result<VerifiedSeller, ApiError> {
        let request = self.post(
            "/verify-seller-otp",
            None,
            &RegistrationRequest::new(account, Some(code)),
        );
        let body: VerifySellerResponse = self.send_for("verify-seller-otp", request).await?;
        Ok(VerifiedSeller {
            seller_id: SellerId::from_string(body.seller.id),
            token: SecretString::new(body.token),
        })
    }

    async fn create_shop(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
        shop: &ShopForm,
    ) -> Result<ShopId, ApiError> {
        let body = CreateShopRequest {
            seller_id: seller_id.as_str(),
            name: shop.name.trim(),
            bio: shop.bio.trim(),
            address: shop.address.trim(),
            opening_hours: shop.opening_hours.trim(),
            website: shop.website.as_deref().map(str::trim).filter(|w| !w.is_empty()),
            category: shop.category.trim(),
        };
        let request = self.post("/create-shop", token, &body);
        let body: CreateShopResponse = self.send_for("create-shop", request).await?;
        Ok(ShopId::from_string(body.shop.id))
    }

    async fn setup_payment(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
        shop_id: &ShopId,
        choice: &PaymentChoice,
    ) -> Result<PaymentSetupOutcome, ApiError> {
        let request = self.post(
            "/setup-payment",
            token,
            &SetupPaymentRequest::new(seller_id, shop_id, choice),
        );
        let payload = self.send("setup-payment", request).await?;
        let redirect = ["url", "redirectUrl", "onboardingUrl"]
            .iter()
            .find_map(|key| payload.get(*key).and_then(Value::as_str))
            .filter(|url| !url.is_empty());
        Ok(match redirect {
            Some(url) => PaymentSetupOutcome::Redirect {
                url: url.to_string(),
            },
            None => PaymentSetupOutcome::Confirmed,
        })
    }

    async fn skip_payment_setup(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
        shop_id: &ShopId,
    ) -> Result<(), ApiError> {
        let body = ShopRef {
            seller_id: seller_id.as_str(),
            shop_id: shop_id.as_str(),
        };
        let request = self.post("/skip-payment-setup", token, &body);
        self.send("skip-payment-setup", request).await.map(drop)
    }

    async fn payment_status(
        &self,
        token: Option<&SecretString>,
        seller_id: &SellerId,
    ) -> Result<bool, ApiError> {
        let url = self.url(&format!("/seller/{}/payment-status", seller_id));
        let request = with_token(self.client.get(url), token);
        let body: PaymentStatusResponse = self.send_for("payment-status", request).await?;
        Ok(body.is_payment_setup)
    }

    async fn send_reset_otp(&self, email: &str) -> Result<(), ApiError> {
        let body = EmailRequest {
            email: email.trim(),
            otp: None,
            password: None,
        };
        let request = self.post("/forgot-password-user", None, &body);
        self.send("forgot-password-user", request).await.map(drop)
    }

    async fn verify_reset_otp(&self, email: &str, code: &OtpCode) -> Result<(), ApiError> {
        let body = EmailRequest {
            email: email.trim(),
            otp: Some(code.as_str()),
            password: None,
        };
        let request = self.post("/verify-forgot-password-otp", None, &body);
        self.send("verify-forgot-password-otp", request).await.map(drop)
    }

    async fn reset_password(&self, email: &str, password: &SecretString) -> Result<(), ApiError> {
        let body = EmailRequest {
            email: email.trim(),
            otp: None,
            password: Some(password.expose()),
        };
        let request = self.post("/reset-password-user", None, &body);
        self.send("reset-password-user", request).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use sf_core::onboarding::BankDetails;

    fn client(base_url: String) -> HttpMarketplaceApi {
        HttpMarketplaceApi::new(&OnboardingConfig {
            api_base_url: base_url,
            request_timeout_secs: 5,
            ..OnboardingConfig::default()
        })
        .unwrap()
    }

    fn account() -> AccountForm {
        AccountForm {
            name: "Ada Atelier".to_string(),
            email: "ada@atelier.test".to_string(),
            phone_number: "+44 7700 900123".to_string(),
            country: "GB".to_string(),
            password: SecretString::from("correct-horse"),
            confirm_password: SecretString::from("correct-horse"),
        }
    }

    fn code() -> OtpCode {
        OtpCode::parse("123456").unwrap()
    }

    #[tokio::test]
    async fn registration_otp_posts_camel_case_account_without_confirmation() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/seller-registration")
            .match_body(Matcher::PartialJson(json!({
                "email": "ada@atelier.test",
                "phoneNumber": "+44 7700 900123",
                "password": "correct-horse",
            })))
            .with_status(200)
            .with_body(r#"{"message":"otp sent","success":true}"#)
            .create_async()
            .await;

        client(server.url()).send_registration_otp(&account()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn verify_registration_reads_seller_and_token_from_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/verify-seller-otp")
            .match_body(Matcher::PartialJson(json!({ "otp": "123456" })))
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"seller":{"id":"S1"},"token":"tok-S1"}}"#)
            .create_async()
            .await;

        let verified = client(server.url())
            .verify_registration_otp(&account(), &code())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(verified.seller_id, SellerId::from("S1"));
        assert_eq!(verified.token.expose(), "tok-S1");
    }

    #[tokio::test]
    async fn verify_registration_accepts_top_level_payload() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/verify-seller-otp")
            .with_status(200)
            .with_body(r#"{"seller":{"id":"S9"},"token":"t"}"#)
            .create_async()
            .await;

        let verified = client(server.url())
            .verify_registration_otp(&account(), &code())
            .await
            .unwrap();
        assert_eq!(verified.seller_id, SellerId::from("S9"));
    }

    #[tokio::test]
    async fn bad_request_maps_to_rejected_with_server_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/verify-seller-otp")
            .with_status(400)
            .with_body(r#"{"message":"Invalid OTP","success":false}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .verify_registration_otp(&account(), &code())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Rejected {
                status: 400,
                message: "Invalid OTP".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unsuccessful_envelope_with_ok_status_is_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/verify-forgot-password-otp")
            .with_status(200)
            .with_body(r#"{"message":"OTP expired","success":false}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .verify_reset_otp("ada@atelier.test", &code())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { message, .. } if message == "OTP expired"));
    }

    #[tokio::test]
    async fn create_shop_sends_bearer_token_and_returns_shop_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/create-shop")
            .match_header("authorization", "Bearer tok-S1")
            .match_body(Matcher::PartialJson(json!({
                "sellerId": "S1",
                "openingHours": "Mon-Fri 10-18",
            })))
            .with_status(201)
            .with_body(r#"{"success":true,"data":{"shop":{"id":"H1"}}}"#)
            .create_async()
            .await;

        let shop = ShopForm {
            name: "Ada's Vintage".to_string(),
            bio: "Curated 70s pieces".to_string(),
            address: "1 Savile Row, London".to_string(),
            opening_hours: "Mon-Fri 10-18".to_string(),
            website: None,
            category: "vintage".to_string(),
        };
        let token = SecretString::from("tok-S1");
        let shop_id = client(server.url())
            .create_shop(Some(&token), &SellerId::from("S1"), &shop)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(shop_id, ShopId::from("H1"));
    }

    #[tokio::test]
    async fn conflict_status_maps_to_conflict() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/create-shop")
            .with_status(409)
            .with_body(r#"{"message":"shop name taken","success":false}"#)
            .create_async()
            .await;

        let shop = ShopForm {
            name: "Taken".to_string(),
            bio: String::new(),
            address: "Somewhere".to_string(),
            opening_hours: String::new(),
            website: None,
            category: "vintage".to_string(),
        };
        let err = client(server.url())
            .create_shop(None, &SellerId::from("S1"), &shop)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Conflict {
                message: "shop name taken".to_string()
            }
        );
    }

    #[tokio::test]
    async fn setup_payment_distinguishes_redirect_from_confirmation() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/setup-payment")
            .match_body(Matcher::PartialJson(json!({ "method": "provider", "provider": "stripe" })))
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"url":"https://pay.example/onboard"}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/setup-payment")
            .match_body(Matcher::PartialJson(json!({ "method": "manual", "bankName": "Thread Bank" })))
            .with_status(200)
            .with_body(r#"{"success":true,"message":"saved"}"#)
            .create_async()
            .await;

        let api = client(server.url());
        let seller = SellerId::from("S1");
        let shop = ShopId::from("H1");

        let provider = PaymentChoice::Provider {
            provider: "stripe".to_string(),
        };
        assert_eq!(
            api.setup_payment(None, &seller, &shop, &provider).await.unwrap(),
            PaymentSetupOutcome::Redirect {
                url: "https://pay.example/onboard".to_string()
            }
        );

        let manual = PaymentChoice::Manual(BankDetails {
            account_holder: "Ada Atelier".to_string(),
            bank_name: "Thread Bank".to_string(),
            account_number: "12345678".to_string(),
            routing_number: "00-11-22".to_string(),
        });
        assert_eq!(
            api.setup_payment(None, &seller, &shop, &manual).await.unwrap(),
            PaymentSetupOutcome::Confirmed
        );
    }

    #[tokio::test]
    async fn payment_status_reads_flag() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/seller/S1/payment-status")
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"isPaymentSetup":true}}"#)
            .create_async()
            .await;

        let is_setup = client(server.url())
            .payment_status(None, &SellerId::from("S1"))
            .await
            .unwrap();
        mock.assert_async().await;
        assert!(is_setup);
    }

    #[tokio::test]
    async fn server_error_without_body_uses_status_reason() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/reset-password-user")
            .with_status(503)
            .create_async()
            .await;

        let err = client(server.url())
            .reset_password("ada@atelier.test", &SecretString::from("tailored-2024"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 503,
                message: "Service Unavailable".to_string()
            }
        );
    }

    #[tokio::test]
    async fn malformed_payload_maps_to_decode() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/seller/S1/payment-status")
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"status":"unknown"}}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .payment_status(None, &SellerId::from("S1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_transport() {
        let err = client("http://127.0.0.1:1".to_string())
            .send_reset_otp("ada@atelier.test")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn status_mapping_follows_http_classes() {
        assert!(matches!(
            map_status(StatusCode::CONFLICT, String::new()),
            ApiError::Conflict { .. }
        ));
        assert_eq!(
            map_status(StatusCode::GATEWAY_TIMEOUT, String::new()),
            ApiError::Timeout
        );
        assert!(matches!(
            map_status(StatusCode::UNPROCESSABLE_ENTITY, String::new()),
            ApiError::Rejected { status: 422, .. }
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, String::new()),
            ApiError::Server { status: 502, .. }
        ));
    }
}
