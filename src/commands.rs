use anyhow::{Context, bail};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};

use pzstore::catalog::{Catalog, CatalogFilter};
use pzstore::dashboard::{DashboardSummary, LicenseView};
use pzstore::error::{AppError, ErrorKind};
use pzstore::flows::{DomainChecker, LauncherProvisioning, RenewalNotice, ScriptPurchase, ThankYouState};
use pzstore::handlers::{self, ReturnEvent, ReturnOutcome};
use pzstore::models::{CheckoutKind, PaymentQuery, PaymentStatus, UpdateLicense};
use pzstore::payments::{self, PaymentPoller};
use pzstore::session::Language;
use pzstore::util::format_display_date;

use super::{App, Command, LicenseArgs};

pub async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Register { name, email, password } => {
            app.client.register(&name, &email, &password).await?;
            println!("Account created. Log in with `pzstore login`.");
        }
        Command::Login { email, password } => {
            app.client.login(&email, &password).await?;
            println!("Logged in.");
        }
        Command::Logout => {
            app.client.logout();
            println!("Logged out.");
        }
        Command::Language { language } => language_command(app, language)?,
        Command::Products { categories, subcategories } => products(app, categories, subcategories).await?,
        Command::Categories => categories(app).await?,
        Command::Dashboard => dashboard(app).await?,
        Command::Licenses => licenses(app).await?,
        Command::Scripts => scripts(app).await?,
        Command::CheckDomain { domain } => check_domain(app, &domain).await?,
        Command::EditLicense {
            token,
            domain,
            theme_url,
            update_url,
        } => {
            let update = UpdateLicense {
                domain,
                theme_url,
                update_url,
            };
            app.client.update_license(&token, &update).await?;
            println!("License {} updated.", token);
        }
        Command::Buy { product_id, license } => buy(app, &product_id, license).await?,
        Command::Renew { license } => renew(app, &license).await?,
        Command::AwaitPayment {
            payment_id,
            user_id,
            product_id,
            launcher,
            license,
        } => {
            let query = PaymentQuery {
                payment_id: Some(payment_id),
                user_id: Some(user_id),
                product_id: Some(product_id),
                ..PaymentQuery::default()
            };
            let kind = if launcher {
                CheckoutKind::Launcher
            } else {
                CheckoutKind::Script
            };
            await_payment(app, kind, query, license).await?;
        }
    }
    Ok(())
}

fn language_command(app: &App, language: Option<String>) -> anyhow::Result<()> {
    let session = app.client.session();
    match language {
        Some(raw) => {
            let language: Language = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("Unknown language {raw:?}, use pt, en or es"))?;
            session.set_language(language);
            println!("Language set to {}.", language);
        }
        None => println!("{}", session.language()),
    }
    Ok(())
}

async fn products(app: &App, categories: Vec<String>, subcategories: Vec<String>) -> anyhow::Result<()> {
    let (products, category_list) = tokio::try_join!(app.client.products(), app.client.categories())?;
    let catalog = Catalog::new(products, category_list);
    let filter = CatalogFilter::with_selection(categories, subcategories);

    let shown = catalog.filtered(&filter);
    if shown.is_empty() {
        println!("No products match the selected filters.");
        return Ok(());
    }

    for product in shown {
        let category = product
            .category_id
            .as_deref()
            .and_then(|id| catalog.category_name(id))
            .unwrap_or("-");
        println!(
            "{}  {}  {}{}",
            product.id,
            product.name,
            product.display_price(),
            if product.is_launcher { "  [launcher]" } else { "" }
        );
        println!("    category: {}  tag: {}", category, product.tag.as_deref().unwrap_or("-"));
        if !product.subcategories.is_empty() {
            println!("    subcategories: {}", product.subcategories.join(", "));
        }
        println!("    {}", product.short_description().replace('\n', " "));
        if let Some(image) = product.image_url(&app.config.asset_url) {
            println!("    image: {}", image);
        }
        if let Some(video) = &product.video_url {
            println!("    video: {}", video);
        }
    }
    Ok(())
}

async fn categories(app: &App) -> anyhow::Result<()> {
    for category in app.client.categories().await? {
        println!("{}  {}", category.id, category.name);
        for sub in &category.subcategories {
            println!("    {}", sub);
        }
    }
    Ok(())
}

async fn dashboard(app: &App) -> anyhow::Result<()> {
    let (user, counts) = tokio::try_join!(app.client.me(), app.client.counts())?;
    let summary = DashboardSummary::build(&user, &counts, Utc::now());

    println!("Welcome, {}.", summary.name);
    println!("  Licenses:       {}", summary.total_licenses);
    println!("  Expiring soon:  {}", summary.expiring_soon);
    match summary.first_expired_at {
        Some(at) => println!("  Expired:        {} (since {})", summary.expired, format_display_date(&at)),
        None => println!("  Expired:        0"),
    }
    println!("  Products:       {}", summary.total_products);

    if !summary.recent_activity.is_empty() {
        println!("Recent activity:");
        for entry in &summary.recent_activity {
            println!(
                "  {:<16} {}  {}",
                entry.health.label(),
                entry.token,
                format_display_date(&entry.expiration_date)
            );
        }
    }
    Ok(())
}

async fn licenses(app: &App) -> anyhow::Result<()> {
    let user = app.client.me().await?;
    let views = LicenseView::list(&user.licenses, Utc::now());
    if views.is_empty() {
        println!("You have no launcher licenses yet.");
        return Ok(());
    }

    for view in views {
        println!(
            "{}  {}  expires {}  {:?}  downloader:{:?}  dashboard:{:?}",
            view.token,
            view.domain,
            format_display_date(&view.expiration_date),
            view.status,
            view.downloader,
            view.dashboard
        );
    }
    Ok(())
}

async fn scripts(app: &App) -> anyhow::Result<()> {
    let user = app.client.me().await?;
    if user.scripts.is_empty() {
        println!("You have no scripts yet.");
        return Ok(());
    }
    for script in &user.scripts {
        println!(
            "{}  {:?}  {}",
            script.product_name,
            script.status,
            script.download_link.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn check_domain(app: &App, domain: &str) -> anyhow::Result<()> {
    let mut checker = DomainChecker::new(app.client.clone(), app.config.domain_debounce);
    checker.edit(domain);
    let state = checker.settled().await;
    if state.exists {
        println!("{} already has a license.", state.domain);
    } else {
        println!("{} is available.", state.domain);
    }
    Ok(())
}

async fn buy(app: &App, product_id: &str, license: LicenseArgs) -> anyhow::Result<()> {
    if !app.client.session().is_authenticated() {
        return Err(AppError::Unauthorized.into());
    }

    let products = app.client.products().await?;
    let product = products
        .iter()
        .find(|p| p.id == product_id)
        .ok_or_else(|| AppError::NotFound(format!("Product {product_id}")))?;

    let (tx, mut rx) = mpsc::channel(8);
    let listener = handlers::serve(&app.config.listen_addr(), tx).await?;
    let checkout = payments::start_purchase(&app.client, product, &listener.base_url()).await?;

    println!("Open this link to pay for {} ({}):", product.name, product.display_price());
    println!("  {}", checkout.init_point);
    println!("Waiting for the payment gateway to send you back...");

    let event = rx.recv().await.context("Return listener stopped")?;
    drop(listener);
    follow_return(app, event, checkout.kind, license).await
}

async fn renew(app: &App, license_ref: &str) -> anyhow::Result<()> {
    let user = app.client.me().await?;
    let license = user
        .licenses
        .iter()
        .find(|l| l.id == license_ref || l.token == license_ref)
        .ok_or_else(|| AppError::NotFound(format!("License {license_ref}")))?;

    let (tx, mut rx) = mpsc::channel(8);
    let listener = handlers::serve(&app.config.listen_addr(), tx).await?;
    let checkout = payments::start_renewal(&app.client, license, &listener.base_url()).await?;

    println!("Open this link to renew {} ({}):", license.token, license.domain);
    println!("  {}", checkout.init_point);

    let event = rx.recv().await.context("Return listener stopped")?;
    drop(listener);
    follow_return(app, event, CheckoutKind::Renewal, LicenseArgs::default()).await
}

async fn follow_return(
    app: &App,
    event: ReturnEvent,
    expected: CheckoutKind,
    license: LicenseArgs,
) -> anyhow::Result<()> {
    let kind = event.kind.unwrap_or(expected);
    match event.outcome {
        ReturnOutcome::Failed => {
            println!("The payment did not go through. Please contact support.");
            Ok(())
        }
        ReturnOutcome::Pending if kind == CheckoutKind::Renewal => {
            println!("{}", RenewalNotice::from_query(&event.query).message());
            Ok(())
        }
        ReturnOutcome::Pending => await_payment(app, kind, event.query, license).await,
        ReturnOutcome::Approved => thank_you(app, kind, event.query, license).await,
    }
}

/// Poll a pending payment, then finish it like an approved return.
async fn await_payment(
    app: &App,
    kind: CheckoutKind,
    query: PaymentQuery,
    license: LicenseArgs,
) -> anyhow::Result<()> {
    let (tx, rx) = oneshot::channel();
    let Some(_poller) = PaymentPoller::from_query(
        app.client.clone(),
        &query,
        app.config.poll_interval,
        move |session| {
            let _ = tx.send(session);
        },
    ) else {
        println!("We could not identify your payment. Please contact support.");
        return Ok(());
    };

    println!("Payment pending. Checking every {}s until it is approved...", app.config.poll_interval.as_secs());
    let session = rx.await.context("Payment polling stopped")?;

    let approved = PaymentQuery {
        payment_id: Some(session.payment_id),
        user_id: Some(session.user_id),
        product_id: Some(session.product_id),
        license_id: query.license_id,
        status: Some(PaymentStatus::Approved.as_str().to_string()),
    };
    thank_you(app, kind, approved, license).await
}

async fn thank_you(app: &App, kind: CheckoutKind, query: PaymentQuery, license: LicenseArgs) -> anyhow::Result<()> {
    match kind {
        CheckoutKind::Script => {
            let mut flow = ScriptPurchase::new(app.client.clone(), query);
            match flow.verify().await {
                ThankYouState::Success(_) => println!("Purchase complete. Your access has been released!"),
                ThankYouState::Error(failure) => {
                    println!("Please contact support.");
                    return Err(AppError::from(failure.clone()).into());
                }
                _ => {}
            }
            Ok(())
        }
        CheckoutKind::Launcher => provision(app, query, license).await,
        CheckoutKind::Renewal => {
            println!("{}", RenewalNotice::from_query(&query).message());
            Ok(())
        }
    }
}

async fn provision(app: &App, query: PaymentQuery, args: LicenseArgs) -> anyhow::Result<()> {
    let mut flow = LauncherProvisioning::new(app.client.clone(), query, app.config.domain_debounce);

    if let ThankYouState::Error(failure) = flow.verify().await {
        println!("Please contact support.");
        return Err(AppError::from(failure.clone()).into());
    }

    let interactive = args.domain.is_none() || args.theme_url.is_none() || args.update_url.is_none();
    let mut args = args;

    println!("Configure your launcher license.");
    loop {
        let domain = match args.domain.take() {
            Some(d) => d,
            None => prompt("Domain (example.com.br)").await?,
        };
        flow.set_domain(&domain);
        let theme_url = match args.theme_url.take() {
            Some(u) => u,
            None => prompt("Theme URL").await?,
        };
        flow.set_theme_url(&theme_url);
        let update_url = match args.update_url.take() {
            Some(u) => u,
            None => prompt("Update URL").await?,
        };
        flow.set_update_url(&update_url);

        if flow.domain_checked().await.exists {
            println!("{} already has a license. Choose another domain.", domain.trim());
            if !interactive {
                return Err(AppError::DuplicateDomain(domain.trim().to_string()).into());
            }
            continue;
        }

        match flow.submit().await {
            Ok(license) => {
                println!("License created!");
                println!("  Token:   {}", license.token);
                println!("  Expires: {}", format_display_date(&license.expiration_date));
                return Ok(());
            }
            Err(e) if e.kind() == ErrorKind::Authentication => return Err(e.into()),
            Err(e) => {
                println!("Could not save the license: {}", e);
                if !interactive {
                    return Err(e.into());
                }
            }
        }
    }
}

async fn prompt(label: &str) -> anyhow::Result<String> {
    let label = label.to_string();
    tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        use std::io::Write;
        print!("{}: ", label);
        std::io::stdout().flush()?;
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            bail!("Input closed");
        }
        Ok(line.trim().to_string())
    })
    .await?
}
