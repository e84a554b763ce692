//! Human-readable snapshot rendering.

use sf_core::onboarding::{OtpView, PaymentLink, SessionSnapshot};

pub fn summary(snapshot: &SessionSnapshot) -> String {
    let mut out = format!("[{}] {}", snapshot.flow, snapshot.stage);
    if let Some(contact) = &snapshot.contact {
        out.push_str(&format!(" ({contact})"));
    }
    if snapshot.busy {
        out.push_str(" ...");
    }
    if let Some(otp) = &snapshot.otp {
        out.push_str("\n  ");
        out.push_str(&otp_line(otp));
    }
    if let Some(seller_id) = &snapshot.seller_id {
        out.push_str(&format!("\n  seller: {seller_id}"));
        if let Some(shop_id) = &snapshot.shop_id {
            out.push_str(&format!("  shop: {shop_id}"));
        }
        match snapshot.payment {
            PaymentLink::Unset => {}
            PaymentLink::Linked => out.push_str("  payment: linked"),
            PaymentLink::ExplicitlySkipped => out.push_str("  payment: skipped"),
        }
    }
    if let Some(url) = &snapshot.redirect_url {
        out.push_str(&format!("\n  finish payment setup at {url}, then type `confirm`"));
    }
    if let Some(error) = &snapshot.error {
        let hint = match snapshot.retryable {
            Some(true) => " (type `retry`)",
            _ => "",
        };
        out.push_str(&format!("\n  ! {error}{hint}"));
    }
    out
}

fn otp_line(otp: &OtpView) -> String {
    let digits: Vec<String> = otp
        .digits
        .iter()
        .map(|d| d.map(String::from).unwrap_or_else(|| "_".to_string()))
        .collect();
    let mut line = format!("code: {}", digits.join(" "));
    if otp.locked {
        line.push_str(" | locked");
    } else {
        line.push_str(&format!(" | {} attempts left", otp.attempts_remaining));
    }
    if otp.verifying {
        line.push_str(" | verifying");
    }
    if otp.resend_in_secs > 0 {
        line.push_str(&format!(" | resend in {}s", otp.resend_in_secs));
    } else if otp.can_resend {
        line.push_str(" | resend available");
    }
    line
}
