use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

struct SessionSecurity;

impl Modify for SessionSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Restaurant POS API",
        version = "1.0.0",
        description = r#"
Point-of-sale and back-office API for a single restaurant.

Every `/api/v1` route needs a session token, sent either as
`Authorization: Bearer <token>` or in the session cookie. Tokens are minted
with `pos-admin token --user-id <uuid>`.

Errors share one body:

```json
{
  "error": "Bad Request",
  "message": "Validation error: Please select a payment method",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-07-09T10:30:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SessionSecurity),
    security(("bearer_auth" = [])),
    tags(
        (name = "carts", description = "Till terminal carts and checkout"),
        (name = "menu", description = "Menu items and their ingredients"),
        (name = "inventory", description = "Stock on hand"),
        (name = "payment-methods", description = "Accepted payment methods"),
        (name = "expenses", description = "Business expenses"),
        (name = "sales", description = "Sales history and manual entry"),
        (name = "dashboard", description = "Monthly income and expense breakdowns"),
        (name = "reports", description = "Spreadsheet exports"),
        (name = "health", description = "Liveness and readiness probes")
    ),
    paths(
        crate::handlers::carts::create_cart,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_item,
        crate::handlers::carts::toggle_remove_mode,
        crate::handlers::carts::step_removal,
        crate::handlers::carts::confirm_remove,
        crate::handlers::carts::select_payment_method,
        crate::handlers::carts::checkout,
        crate::handlers::carts::discard_cart,

        crate::handlers::menu::list_menu_items,
        crate::handlers::menu::get_menu_item,
        crate::handlers::menu::create_menu_item,
        crate::handlers::menu::update_menu_item,
        crate::handlers::menu::deactivate_menu_item,

        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::get_inventory_item,
        crate::handlers::inventory::create_inventory_item,
        crate::handlers::inventory::update_inventory_item,
        crate::handlers::inventory::delete_inventory_item,
        crate::handlers::inventory::list_categories,
        crate::handlers::inventory::stock_summary,

        crate::handlers::payment_methods::list_payment_methods,
        crate::handlers::payment_methods::create_payment_method,

        crate::handlers::expenses::list_expenses,
        crate::handlers::expenses::create_expense,

        crate::handlers::sales::list_sales,
        crate::handlers::sales::sale_payment_method_names,
        crate::handlers::sales::sale_form_options,
        crate::handlers::sales::record_manual_sale,

        crate::handlers::dashboard::dashboard_summary,
        crate::handlers::dashboard::dashboard_months,

        crate::handlers::reports::export_sales,
        crate::handlers::reports::export_inventory,

        crate::handlers::health::liveness_check,
        crate::handlers::health::readiness_check,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::handlers::common::PaginationMeta,
            crate::handlers::carts::AddCartItemRequest,
            crate::handlers::carts::StepRemovalRequest,
            crate::handlers::carts::ConfirmRemoveRequest,
            crate::handlers::carts::SelectPaymentMethodRequest,
            crate::handlers::carts::CheckoutRequest,
            crate::handlers::carts::RemovalResult,
            crate::handlers::inventory::StockSummary,
            crate::pos::CartLine,
            crate::pos::RemovalState,
            crate::services::carts::CartView,
            crate::services::checkout::Receipt,
            crate::services::menu::MenuItemView,
            crate::services::menu::Ingredient,
            crate::services::menu::IngredientInput,
            crate::services::menu::CreateMenuItemRequest,
            crate::services::menu::UpdateMenuItemRequest,
            crate::services::inventory::CreateInventoryItemRequest,
            crate::services::inventory::UpdateInventoryItemRequest,
            crate::services::payment_methods::CreatePaymentMethodRequest,
            crate::services::expenses::CreateExpenseRequest,
            crate::services::sales::SaleView,
            crate::services::sales::SaleLineView,
            crate::services::sales::ManualSaleRequest,
            crate::services::sales::ManualSaleLine,
            crate::services::sales::SaleFormOptions,
            crate::services::sales::MenuOption,
            crate::services::sales::PaymentOption,
            crate::services::dashboard::DashboardSummary,
            crate::services::dashboard::AmountByName,
            crate::services::dashboard::ShareByName,
            crate::entities::inventory_item::Model,
            crate::entities::payment_method::Model,
            crate::entities::expense::Model,
            crate::entities::sale::Model,
            crate::entities::sale_item::Model,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_the_till_routes() {
        let json = serde_json::to_string_pretty(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Restaurant POS API"));
        assert!(json.contains("/api/v1/carts/{id}/checkout"));
        assert!(json.contains("/api/v1/reports/sales"));
        assert!(json.contains("bearer_auth"));
    }
}
