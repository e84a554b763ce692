//! Interactive drivers: read a line, turn it into a flow input, show the result.

use std::time::Duration;

use tokio::io::AsyncBufRead;
use tracing::{debug, info};

use sf_app::usecases::flow::{FlowEffects, FlowOrchestrator};
use sf_app::{PasswordResetOrchestrator, RegistrationOrchestrator};
use sf_core::onboarding::{
    AccountForm, BankDetails, FlowMachine, NewPasswordForm, PaymentChoice, PaymentLink,
    SessionSnapshot, ShopForm, OTP_LENGTH,
};

use super::command::{self, Command};
use super::prompt::{Console, Prompt};

const OTP_HELP: &str = "type the code (all at once or digit by digit), \
`del [slot]`, `submit`, `resend`, `retry`, `back`, `restart` or `quit`";
const SHOP_HELP: &str = "press enter to describe your shop, or `retry`, `restart`, `quit`";
const PAYMENT_HELP: &str = "`provider <name>`, `manual`, `confirm` after a hosted setup, \
`skip`, `retry`, `restart` or `quit`";

/// What the driver does after handling one line.
enum Next {
    Show(SessionSnapshot),
    Stay,
    Quit,
}

pub async fn run_registration<R: AsyncBufRead + Unpin>(
    flow: &RegistrationOrchestrator,
    prompt: &mut Prompt<R>,
    console: Console,
) -> anyhow::Result<()> {
    let mut snapshot = flow.snapshot().await;
    console.show(&snapshot)?;

    loop {
        let next = match snapshot.stage.as_str() {
            "collecting-account" => {
                if snapshot.retryable == Some(true)
                    && prompt.confirm("Send the code again with the same details?").await?
                {
                    Next::Show(flow.retry().await)
                } else {
                    Next::Show(flow.submit_account(read_account(prompt).await?).await)
                }
            }
            "otp-pending" => {
                let line = prompt.ask("code").await?;
                otp_input(flow, &snapshot, command::parse(&line), console).await
            }
            // Advances on its own; pick up the next stage.
            "verified" => {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let updated = flow.snapshot().await;
                if updated.stage == snapshot.stage {
                    continue;
                }
                Next::Show(updated)
            }
            "provisioning-shop" => {
                let line = prompt.ask("shop").await?;
                match command::parse(&line) {
                    Command::Continue => Next::Show(flow.submit_shop(read_shop(prompt).await?).await),
                    other => common_input(flow, other, SHOP_HELP, console).await,
                }
            }
            "provisioning-payment" => {
                let line = prompt.ask("payment").await?;
                match command::parse(&line) {
                    Command::Provider(provider) => {
                        Next::Show(flow.link_payment(PaymentChoice::Provider { provider }).await)
                    }
                    Command::Manual => {
                        let bank = read_bank_details(prompt).await?;
                        Next::Show(flow.link_payment(PaymentChoice::Manual(bank)).await)
                    }
                    Command::Confirm => Next::Show(flow.confirm_payment_return().await),
                    Command::Skip => Next::Show(flow.skip_payment().await),
                    other => common_input(flow, other, PAYMENT_HELP, console).await,
                }
            }
            "complete" => {
                if snapshot.payment == PaymentLink::ExplicitlySkipped
                    && flow.acknowledge_payment_skip().await
                {
                    debug!("payment skip reported");
                }
                info!(
                    seller_id = ?snapshot.seller_id,
                    shop_id = ?snapshot.shop_id,
                    "registration complete"
                );
                console.say("Your shop is ready.");
                return Ok(());
            }
            other => anyhow::bail!("unexpected registration stage `{other}`"),
        };

        match next {
            Next::Show(updated) => {
                snapshot = updated;
                console.show(&snapshot)?;
            }
            Next::Stay => {}
            Next::Quit => return Ok(()),
        }
    }
}

pub async fn run_password_reset<R: AsyncBufRead + Unpin>(
    flow: &PasswordResetOrchestrator,
    prompt: &mut Prompt<R>,
    console: Console,
    mut email: Option<String>,
) -> anyhow::Result<()> {
    let mut snapshot = flow.snapshot().await;
    console.show(&snapshot)?;

    loop {
        let next = match snapshot.stage.as_str() {
            "collecting-email" => {
                if snapshot.retryable == Some(true)
                    && prompt.confirm("Send the code again?").await?
                {
                    Next::Show(flow.retry().await)
                } else {
                    let address = match email.take() {
                        Some(address) => address,
                        None => prompt.ask("email").await?,
                    };
                    Next::Show(flow.submit_email(address).await)
                }
            }
            "otp-pending" => {
                let line = prompt.ask("code").await?;
                otp_input(flow, &snapshot, command::parse(&line), console).await
            }
            "resetting-password" => {
                if snapshot.retryable == Some(true) && prompt.confirm("Try again?").await? {
                    Next::Show(flow.retry().await)
                } else {
                    let line = prompt.ask("press enter to choose a new password, or `back`").await?;
                    match command::parse(&line) {
                        Command::Continue => {
                            let form = NewPasswordForm {
                                password: prompt.ask_secret("new password").await?,
                                confirm_password: prompt.ask_secret("confirm password").await?,
                            };
                            Next::Show(flow.submit_new_password(form).await)
                        }
                        other => common_input(flow, other, "enter, `back`, `restart` or `quit`", console).await,
                    }
                }
            }
            "done" => {
                console.say("Password updated. You can sign in now.");
                return Ok(());
            }
            other => anyhow::bail!("unexpected password reset stage `{other}`"),
        };

        match next {
            Next::Show(updated) => {
                snapshot = updated;
                console.show(&snapshot)?;
            }
            Next::Stay => {}
            Next::Quit => return Ok(()),
        }
    }
}

/// Code entry, shared by both flows.
async fn otp_input<M: FlowMachine, E: FlowEffects<M>>(
    flow: &FlowOrchestrator<M, E>,
    snapshot: &SessionSnapshot,
    command: Command,
    console: Console,
) -> Next {
    let focused = snapshot.otp.as_ref().map_or(0, |otp| otp.focused_slot);
    match command {
        Command::Digits(digits) => {
            let mut latest = None;
            for (offset, digit) in digits.chars().enumerate() {
                let slot = focused + offset;
                if slot >= OTP_LENGTH {
                    break;
                }
                let updated = flow.enter_digit(slot, digit.to_string()).await;
                let left_stage = updated.stage != snapshot.stage;
                latest = Some(updated);
                if left_stage {
                    break;
                }
            }
            latest.map_or(Next::Stay, Next::Show)
        }
        Command::Delete(slot) => {
            let slot = slot.unwrap_or_else(|| {
                let filled = snapshot
                    .otp
                    .as_ref()
                    .is_some_and(|otp| otp.digits[focused].is_some());
                if filled {
                    focused
                } else {
                    focused.saturating_sub(1)
                }
            });
            Next::Show(flow.delete_digit(slot).await)
        }
        Command::Submit => Next::Show(flow.submit_code().await),
        Command::Resend => Next::Show(flow.resend_code().await),
        other => common_input(flow, other, OTP_HELP, console).await,
    }
}

/// Inputs every stage understands.
async fn common_input<M: FlowMachine, E: FlowEffects<M>>(
    flow: &FlowOrchestrator<M, E>,
    command: Command,
    help: &str,
    console: Console,
) -> Next {
    match command {
        Command::Retry => Next::Show(flow.retry().await),
        Command::Back => Next::Show(flow.back().await),
        Command::Restart => Next::Show(flow.restart().await),
        Command::Status => Next::Show(flow.snapshot().await),
        Command::Quit => Next::Quit,
        Command::Unknown(line) => {
            console.say(&format!("unknown input `{line}`; {help}"));
            Next::Stay
        }
        _ => {
            console.say(help);
            Next::Stay
        }
    }
}

async fn read_account<R: AsyncBufRead + Unpin>(
    prompt: &mut Prompt<R>,
) -> anyhow::Result<AccountForm> {
    Ok(AccountForm {
        name: prompt.ask("full name").await?,
        email: prompt.ask("email").await?,
        phone_number: prompt.ask("phone number").await?,
        country: prompt.ask("country").await?,
        password: prompt.ask_secret("password").await?,
        confirm_password: prompt.ask_secret("confirm password").await?,
    })
}

async fn read_shop<R: AsyncBufRead + Unpin>(prompt: &mut Prompt<R>) -> anyhow::Result<ShopForm> {
    Ok(ShopForm {
        name: prompt.ask("shop name").await?,
        bio: prompt.ask("bio").await?,
        address: prompt.ask("address").await?,
        opening_hours: prompt.ask("opening hours").await?,
        website: prompt.ask_optional("website").await?,
        category: prompt.ask("category").await?,
    })
}

async fn read_bank_details<R: AsyncBufRead + Unpin>(
    prompt: &mut Prompt<R>,
) -> anyhow::Result<BankDetails> {
    Ok(BankDetails {
        account_holder: prompt.ask("account holder").await?,
        bank_name: prompt.ask("bank name").await?,
        account_number: prompt.ask("account number").await?,
        routing_number: prompt.ask("routing number").await?,
    })
}
