#[tokio::main]
async fn main() {
    stem_forum_api::start_server().await;
}
