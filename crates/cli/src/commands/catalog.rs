//! Product listing and search.

use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CommandError, Shop, print_products};

/// `qkart products`
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
pub async fn products(shop: &Shop) -> Result<(), CommandError> {
    let products = shop.load_catalog().await?;
    print_products(&products);
    Ok(())
}

/// `qkart search <text>`. A failed search prints no results.
pub async fn search(shop: &Shop, text: &str) {
    let products = shop.search_now(text).await;
    print_products(&products);
}

/// `qkart browse`
///
/// Every line read from stdin replaces the search text, as if typed into a
/// search box; results are printed whenever a debounced search completes.
/// At end of input, waits for the search for the last line to answer.
///
/// # Errors
///
/// Returns an error if stdin cannot be read.
#[allow(clippy::print_stdout)]
pub async fn browse(shop: &Shop) -> Result<(), CommandError> {
    let mut results = shop.subscribe_search();
    let mut done = shop.subscribe_search();
    let printer = tokio::spawn(async move {
        while results.changed().await.is_ok() {
            let latest = results.borrow_and_update().clone();
            println!("-- results for {:?}", latest.query);
            print_products(&latest.products);
        }
    });

    let mut last = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim().to_string();
        shop.on_search_input(&text);
        last = Some(text);
    }

    if let Some(last) = last {
        let grace = shop.config().search_debounce + shop.config().http_timeout;
        let answered = done.wait_for(|r| r.query == last);
        if tokio::time::timeout(grace, answered).await.is_err() {
            tracing::warn!(query = %last, "gave up waiting for search results");
        }
        // Let the printer catch up with the final results
        tokio::task::yield_now().await;
    }

    printer.abort();
    Ok(())
}
