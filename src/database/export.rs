use warp::http::{header, StatusCode};
use warp::Reply;

use crate::{
    schema::ShoppingListItem, SHOPPING_LIST_FILENAME, SHOPPING_LIST_HEADER,
};

/// Flat text document: fixed header line, then one line per aggregated
/// ingredient. An empty cart renders the header only.
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    let mut out = String::from(SHOPPING_LIST_HEADER);
    out.push_str("\n\n");
    for item in items {
        out.push_str(&format!(
            "{}, {} {}\n",
            item.name, item.total_amount, item.measurement_unit
        ));
    }
    out
}

/// Download reply for the aggregated purchase list.
pub fn shopping_list_reply(items: &[ShoppingListItem]) -> impl Reply {
    let body = render_shopping_list(items);
    let reply = warp::reply::with_status(body, StatusCode::OK);
    let reply = warp::reply::with_header(
        reply,
        header::CONTENT_TYPE,
        "text/plain; charset=utf-8",
    );
    warp::reply::with_header(
        reply,
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_item_after_the_header() {
        let items = vec![
            ShoppingListItem {
                name: String::from("Egg"),
                measurement_unit: String::from("pcs"),
                total_amount: 2,
            },
            ShoppingListItem {
                name: String::from("Flour"),
                measurement_unit: String::from("g"),
                total_amount: 500,
            },
        ];

        assert_eq!(
            render_shopping_list(&items),
            "Shopping list:\n\nEgg, 2 pcs\nFlour, 500 g\n"
        );
    }

    #[test]
    fn empty_cart_renders_header_only() {
        assert_eq!(render_shopping_list(&[]), "Shopping list:\n\n");
    }

    #[test]
    fn reply_carries_download_headers() {
        let response = shopping_list_reply(&[]).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE.as_str()],
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION.as_str()],
            "attachment; filename=\"shopping-list.txt\""
        );
    }
}
