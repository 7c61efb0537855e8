//! Request bodies sent to the card gateway (Mastercard Gateway REST API).

use serde::Serialize;

pub const WALLET_PROVIDER: &str = "APPLE_PAY";
pub const CRYPTOGRAM_FORMAT: &str = "3DSECURE";
pub const TRANSACTION_SOURCE: &str = "INTERNET";
pub const POS_LOCATION: &str = "PAYER_TERMINAL_OFF_PREMISES";
/// Anonymous ANI sent with server-decrypted device payments.
pub const DEVICE_ANI: &str = "12341234";

/// `apiOperation` of a transaction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiOperation {
    /// Server-decrypted card fields.
    Authorize,
    /// Encrypted token forwarded for gateway-side decryption.
    Pay,
}

/// Body of `PUT /merchant/{id}/order/{orderId}/transaction/{transactionId}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPayload {
    pub api_operation: ApiOperation,
    pub order: OrderDetails,
    pub source_of_funds: SourceOfFunds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_terminal: Option<PosTerminal>,
    pub transaction: TransactionDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    /// Decimal string with two fraction digits.
    pub amount: String,
    pub currency: String,
    pub wallet_provider: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOfFunds {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub provided: ProvidedFunds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvidedFunds {
    pub card: Card,
}

#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<Expiry>,
    pub device_payment: DevicePayment,
}

impl std::fmt::Debug for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Card")
            .field("number", &self.number.as_ref().map(|_| "[REDACTED]"))
            .field("expiry", &self.expiry)
            .field("device_payment", &self.device_payment)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expiry {
    pub month: String,
    pub year: String,
}

#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePayment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cryptogram_format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_payment_cryptogram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eci_indicator: Option<String>,
    /// The original token JSON, byte-for-byte as received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<String>,
}

impl std::fmt::Debug for DevicePayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevicePayment")
            .field("cryptogram_format", &self.cryptogram_format)
            .field(
                "online_payment_cryptogram_len",
                &self.online_payment_cryptogram.as_ref().map(String::len),
            )
            .field("eci_indicator", &self.eci_indicator)
            .field("payment_token_len", &self.payment_token.as_ref().map(String::len))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub ani: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosTerminal {
    pub location: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDetails {
    pub source: &'static str,
}

// ---------------------------------------------------------------------------
// Hosted checkout session
// ---------------------------------------------------------------------------

/// Body of `POST /merchant/{id}/session`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    pub api_operation: &'static str,
    pub interaction: Interaction,
    pub order: SessionOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub operation: &'static str,
    pub merchant: InteractionMerchant,
    pub display_control: DisplayControl,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionMerchant {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayControl {
    pub billing_address: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOrder {
    pub amount: String,
    pub currency: String,
    pub id: String,
    pub description: String,
}

impl CheckoutSessionRequest {
    /// An `INITIATE_CHECKOUT` request that authorizes on completion.
    pub fn initiate(
        merchant_name: &str,
        merchant_logo: Option<&str>,
        amount: &str,
        currency: &str,
        order_id: &str,
    ) -> Self {
        Self {
            api_operation: "INITIATE_CHECKOUT",
            interaction: Interaction {
                operation: "AUTHORIZE",
                merchant: InteractionMerchant {
                    name: merchant_name.to_owned(),
                    logo: merchant_logo.map(str::to_owned),
                },
                display_control: DisplayControl {
                    billing_address: "HIDE",
                },
            },
            order: SessionOrder {
                amount: amount.to_owned(),
                currency: currency.to_owned(),
                id: order_id.to_owned(),
                description: "Apple Pay Payment".into(),
            },
        }
    }
}
