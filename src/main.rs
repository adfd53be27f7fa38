#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    report_mail_server::run().await
}
