use std::{path::PathBuf, process, sync::Arc};

use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use telepay_core::{
    AppointmentDirectory, DeepLinkRouter, InMemoryAppointments, InitiateRequest, NotificationSink,
    PaymentInitiator, PaymentNotification, PaymentSession, Reconciliation, RetryPolicy,
    VerificationReconciler,
};
use telepay_driver_paystack::BackendClient;
use telepay_types::GatewayConfig;

mod state;

use state::StateFile;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Telepay - telehealth payment flow CLI", long_about = None)]
struct Opts {
    /// Path to the payment state file (default: ./payments.yaml)
    #[arg(
        long = "state-path",
        short = 's',
        global = true,
        default_value = "./payments.yaml"
    )]
    state_path: PathBuf,

    /// Bearer token for the backend API
    #[arg(long = "token", global = true, env = "TELEPAY_API_TOKEN")]
    token: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a payment for an appointment and open the checkout page
    Initiate(InitiateCommand),
    /// Verify a payment by transaction reference (manual retry path)
    Verify(VerifyCommand),
    /// Deliver a payment callback deep-link, as the platform listener would
    Callback(CallbackCommand),
    /// List tracked checkout attempts and their states
    Status,
}

#[derive(Args, Debug)]
struct InitiateCommand {
    /// Appointment to pay for
    #[arg(long = "appointment")]
    appointment_id: String,

    /// Consultation fee in major currency units (e.g. 150.00)
    #[arg(long)]
    amount: f64,

    /// Payer email, required by the gateway
    #[arg(long)]
    email: String,

    #[arg(long = "doctor-id")]
    doctor_id: Option<String>,

    #[arg(long = "doctor-name")]
    doctor_name: Option<String>,

    #[arg(long = "patient-id")]
    patient_id: Option<String>,

    /// Appointment date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,

    /// Appointment time (HH:MM)
    #[arg(long)]
    time: Option<String>,

    /// Print the checkout URL instead of opening a browser
    #[arg(long = "no-open", default_value = "false")]
    no_open: bool,
}

#[derive(Args, Debug)]
struct VerifyCommand {
    /// Transaction reference from initiation
    reference: String,
}

#[derive(Args, Debug)]
struct CallbackCommand {
    /// Full callback URI, e.g. "telepay://payment-callback?reference=TPAY_..."
    uri: String,
}

/// Sink that narrates payment outcomes on the console.
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, notification: PaymentNotification) {
        match notification {
            PaymentNotification::Confirmed {
                reference,
                appointment_id,
            } => {
                println!("✓ Appointment {appointment_id} confirmed (reference {reference})");
            }
            PaymentNotification::Failed { reference, reason } => {
                println!("✗ Payment {reference} failed: {reason}");
                println!("  Retrying requires a new `telepay initiate` (a fresh reference).");
            }
            PaymentNotification::Pending { reference } => {
                println!("… Payment {reference} still pending, retry with: telepay verify {reference}");
            }
        }
    }
}

struct Context {
    config: GatewayConfig,
    backend: BackendClient,
    session: Arc<PaymentSession>,
    appointments: Arc<InMemoryAppointments>,
    state_path: PathBuf,
}

impl Context {
    fn load(opts: &Opts) -> anyhow::Result<Self> {
        let config = GatewayConfig::from_env().map_err(anyhow::Error::msg)?;
        let backend = BackendClient::new(config.backend_url.clone(), opts.token.clone());
        let session = PaymentSession::new();
        let appointments = Arc::new(InMemoryAppointments::new());
        StateFile::load(&opts.state_path)?.restore_into(&session, &appointments);
        Ok(Self {
            config,
            backend,
            session,
            appointments,
            state_path: opts.state_path.clone(),
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        StateFile::capture(&self.session, &self.appointments).save(&self.state_path)
    }

    fn initiator(&self) -> PaymentInitiator<BackendClient> {
        PaymentInitiator::new(
            self.backend.clone(),
            self.config.clone(),
            Arc::clone(&self.session),
            Arc::clone(&self.appointments) as Arc<dyn AppointmentDirectory>,
        )
    }

    fn reconciler(&self) -> VerificationReconciler<BackendClient> {
        VerificationReconciler::new(
            self.backend.clone(),
            Arc::clone(&self.session),
            Arc::clone(&self.appointments) as Arc<dyn AppointmentDirectory>,
            Arc::new(ConsoleSink),
            RetryPolicy::default(),
        )
    }
}

#[tokio::main]
async fn main() {
    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let _ = e.print();
            process::exit(e.exit_code());
        }
    };

    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    if let Err(e) = run(opts).await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let context = Context::load(&opts)?;

    match &opts.command {
        Command::Initiate(command) => initiate(&context, command).await,
        Command::Verify(command) => verify(&context, &command.reference).await,
        Command::Callback(command) => callback(&context, &command.uri).await,
        Command::Status => status(&context),
    }
}

async fn initiate(context: &Context, command: &InitiateCommand) -> anyhow::Result<()> {
    let mut metadata = IndexMap::new();
    let optional = [
        ("doctorId", &command.doctor_id),
        ("doctorName", &command.doctor_name),
        ("patientId", &command.patient_id),
        ("appointmentDate", &command.date),
        ("appointmentTime", &command.time),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            metadata.insert(key.to_string(), value.clone());
        }
    }

    let handoff = context
        .initiator()
        .initiate(InitiateRequest {
            appointment_id: command.appointment_id.clone(),
            amount: command.amount,
            payer_email: command.email.clone(),
            metadata,
        })
        .await?;
    context.save()?;

    println!("✓ Payment initialized");
    println!("  reference: {}", handoff.reference);
    println!("  checkout:  {}", handoff.checkout_url);

    if command.no_open {
        println!("Open the checkout URL to complete payment, then run:");
    } else if let Err(e) = open::that(handoff.checkout_url.as_str()) {
        println!("Could not open a browser ({e}); open the checkout URL manually, then run:");
    } else {
        println!("Complete the payment in the browser, then run:");
    }
    println!("  telepay verify {}", handoff.reference);
    Ok(())
}

async fn verify(context: &Context, reference: &str) -> anyhow::Result<()> {
    let outcome = context.reconciler().verify(reference).await?;
    context.save()?;

    match outcome {
        Reconciliation::Confirmed(_) | Reconciliation::Failed(_) => {
            // The console sink already narrated the transition.
        }
        Reconciliation::AlreadyConfirmed(result) => {
            println!(
                "✓ Payment {reference} was already confirmed ({} for appointment {})",
                result.amount,
                result.appointment_id.unwrap_or_default()
            );
        }
        Reconciliation::AlreadyFailed(result) => {
            println!(
                "✗ Payment {reference} already failed: {}",
                result.reason.unwrap_or_default()
            );
        }
        Reconciliation::StillPending(_) => {
            // Pending notification already printed the retry hint.
        }
        Reconciliation::DuplicateTrigger => {
            println!("A verification for {reference} is already in progress.");
        }
    }
    Ok(())
}

async fn callback(context: &Context, uri: &str) -> anyhow::Result<()> {
    let router = DeepLinkRouter::new(&context.config);
    match router.accept(uri, &context.session) {
        Some(reference) => {
            println!("Deep-link delivered reference {reference}");
            verify(context, &reference).await
        }
        None => {
            println!("Ignored: not a payment callback for this app.");
            Ok(())
        }
    }
}

fn status(context: &Context) -> anyhow::Result<()> {
    let state = StateFile::capture(&context.session, &context.appointments);
    if state.attempts.is_empty() {
        println!("No tracked checkout attempts.");
        return Ok(());
    }
    let now = chrono::Utc::now();
    for attempt in &state.attempts {
        let reference = &attempt.intent.reference;
        let elapsed = context
            .session
            .elapsed(reference, now)
            .map(|d| format!("{}m", d.num_minutes()))
            .unwrap_or_default();
        let state = match &attempt.state {
            telepay_core::VerificationState::Pending => "pending",
            telepay_core::VerificationState::Success(_) => "success",
            telepay_core::VerificationState::Failed(_) => "failed",
        };
        println!(
            "{reference}  appointment={}  amount={}  state={state}  age={elapsed}",
            attempt.intent.appointment_id, attempt.intent.amount
        );
    }
    for (appointment_id, payment_state) in &state.appointments {
        println!(
            "appointment {appointment_id}: {}",
            serde_yml::to_string(payment_state).unwrap_or_default().trim()
        );
    }
    Ok(())
}
