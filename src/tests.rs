#[cfg(test)]
mod integration_tests {
    use crate::config::DEFAULT_SESSION_COOKIE;
    use crate::schemas::{ApiResponse, HealthResponse, ProductResponse};
    use crate::seed::{DEFAULT_EMPLOYEE_EMAIL, DEFAULT_EMPLOYEE_PASSWORD, SAMPLE_FARMER_PASSWORD};
    use crate::test_utils::test_utils::{setup_seeded_app, setup_test_app};
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::{TestResponse, TestServer};
    use serde::Serialize;

    #[derive(Serialize)]
    struct LoginForm<'a> {
        email: &'a str,
        password: &'a str,
        return_url: &'a str,
    }

    #[derive(Serialize)]
    struct AddFarmerForm<'a> {
        first_name: &'a str,
        last_name: &'a str,
        farm_name: &'a str,
        email: &'a str,
        phone_number: &'a str,
        address: &'a str,
        password: &'a str,
        confirm_password: &'a str,
    }

    #[derive(Serialize)]
    struct AddProductForm<'a> {
        name: &'a str,
        category: &'a str,
        production_date: &'a str,
        price: &'a str,
        quantity: &'a str,
        description: &'a str,
    }

    fn location(response: &TestResponse) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .expect("Expected a Location header")
            .to_str()
            .unwrap()
            .to_string()
    }

    fn session_header(session_id: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("{}={}", DEFAULT_SESSION_COOKIE, session_id)).unwrap()
    }

    async fn post_login(server: &TestServer, email: &str, password: &str, return_url: &str) -> TestResponse {
        server
            .post("/Account/Login")
            .form(&LoginForm {
                email,
                password,
                return_url,
            })
            .await
    }

    /// Sign in and return the session id from the cookie
    async fn sign_in(server: &TestServer, email: &str, password: &str) -> String {
        let response = post_login(server, email, password, "").await;
        response.assert_status(StatusCode::SEE_OTHER);
        response.cookie(DEFAULT_SESSION_COOKIE).value().to_string()
    }

    async fn get_as(server: &TestServer, path: &str, session_id: &str) -> TestResponse {
        server
            .get(path)
            .add_header(header::COOKIE, session_header(session_id))
            .await
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: HealthResponse = response.json();
        assert_eq!(body.status, "healthy");
        assert_eq!(body.database, "connected");
    }

    #[tokio::test]
    async fn test_public_pages() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        for path in ["/", "/Home/Index", "/Home/Privacy", "/Home/Error", "/Account/Login"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::OK);
            assert!(response.text().contains("AgriEnergy Connect"), "{} should render the layout", path);
        }

        server.get("/Account/AccessDenied").await.assert_status(StatusCode::FORBIDDEN);
        server.get("/no/such/page").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_assets_and_openapi() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        server.get("/static/site.css").await.assert_status(StatusCode::OK);

        let response = server.get("/api-docs/openapi.json").await;
        response.assert_status(StatusCode::OK);
        let doc: serde_json::Value = response.json();
        assert!(doc["paths"]["/api/v1/products"].is_object());
    }

    #[tokio::test]
    async fn test_protected_pages_redirect_to_login() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let response = server.get("/Employee/Index").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/Account/Login?ReturnUrl=%2FEmployee%2FIndex");

        let response = server.get("/Farmer/AddProduct").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/Account/Login?ReturnUrl=%2FFarmer%2FAddProduct");

        let response = server.get("/api/v1/products?category=Grains").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "/Account/Login?ReturnUrl=%2Fapi%2Fv1%2Fproducts%3Fcategory%3DGrains"
        );

        // A cookie naming no live session is treated as signed out
        let response = get_as(&server, "/Farmer/Index", "stale-session-id").await;
        response.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_login_page_keeps_local_return_url() {
        let app = setup_test_app().await;
        let server = TestServer::new(app).unwrap();

        let page = server.get("/Account/Login?ReturnUrl=%2FEmployee%2FProducts").await.text();
        // Autoescaping renders '/' as "&#x2F;"
        assert!(page.contains("value=\"&#x2F;Employee&#x2F;Products\""));

        let page = server.get("/Account/Login?ReturnUrl=https%3A%2F%2Fevil.example.com").await.text();
        assert!(!page.contains("evil.example.com"));
    }

    #[tokio::test]
    async fn test_employee_login_and_dashboard() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();

        let response = post_login(&server, DEFAULT_EMPLOYEE_EMAIL, DEFAULT_EMPLOYEE_PASSWORD, "").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/Employee/Index");

        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
        assert!(set_cookie.starts_with(".AgriEnergy.Session="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Path=/"));

        let session_id = response.cookie(DEFAULT_SESSION_COOKIE).value().to_string();
        let dashboard = get_as(&server, "/Employee/Index", &session_id).await;
        dashboard.assert_status(StatusCode::OK);
        let body = dashboard.text();
        assert!(body.contains("John Smith"));
        assert!(body.contains("Green Valley Farm"));
        assert!(body.contains("Sunrise Organics"));
        assert!(body.contains("Riverbend Acres"));

        get_as(&server, "/Employee", &session_id).await.assert_status(StatusCode::OK);
        get_as(&server, "/Employee/AddFarmer", &session_id).await.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_follows_local_return_url_only() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();

        let response = post_login(
            &server,
            DEFAULT_EMPLOYEE_EMAIL,
            DEFAULT_EMPLOYEE_PASSWORD,
            "/Employee/Products?category=Grains",
        )
        .await;
        assert_eq!(location(&response), "/Employee/Products?category=Grains");

        let response = post_login(
            &server,
            DEFAULT_EMPLOYEE_EMAIL,
            DEFAULT_EMPLOYEE_PASSWORD,
            "//evil.example.com/",
        )
        .await;
        assert_eq!(location(&response), "/Employee/Index");
    }

    #[tokio::test]
    async fn test_failed_login() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();

        let response = post_login(&server, DEFAULT_EMPLOYEE_EMAIL, "Employee124!", "").await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Invalid login attempt."));
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let response = post_login(&server, "not-an-email", "x", "").await;
        response.assert_status(StatusCode::OK);
        let body = response.text();
        assert!(body.contains("The Email field is not a valid e-mail address."));
        assert!(body.contains("The Password must be at least 6 characters long."));
    }

    #[tokio::test]
    async fn test_login_lockout() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();

        for _ in 0..4 {
            let response = post_login(&server, "mike@greenvalley.com", "Wrong123!", "").await;
            assert!(response.text().contains("Invalid login attempt."));
        }
        let response = post_login(&server, "mike@greenvalley.com", "Wrong123!", "").await;
        assert!(response.text().contains("locked out"));

        // Locked out even with the right password
        let response = post_login(&server, "mike@greenvalley.com", SAMPLE_FARMER_PASSWORD, "").await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("locked out"));
    }

    #[tokio::test]
    async fn test_role_checks() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();

        let response = post_login(&server, "sarah@sunrise.com", SAMPLE_FARMER_PASSWORD, "").await;
        assert_eq!(location(&response), "/Farmer/Index");
        let farmer_session = response.cookie(DEFAULT_SESSION_COOKIE).value().to_string();

        let response = get_as(&server, "/Employee/Index", &farmer_session).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/Account/AccessDenied");

        let response = get_as(&server, "/api/v1/products", &farmer_session).await;
        assert_eq!(location(&response), "/Account/AccessDenied");

        let employee_session = sign_in(&server, DEFAULT_EMPLOYEE_EMAIL, DEFAULT_EMPLOYEE_PASSWORD).await;
        let response = get_as(&server, "/Farmer/Index", &employee_session).await;
        assert_eq!(location(&response), "/Account/AccessDenied");
    }

    #[tokio::test]
    async fn test_farmer_dashboard_lists_own_products() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();

        let session_id = sign_in(&server, "david@riverbend.com", SAMPLE_FARMER_PASSWORD).await;
        let response = get_as(&server, "/Farmer/Index", &session_id).await;
        response.assert_status(StatusCode::OK);

        let body = response.text();
        assert!(body.contains("Riverbend Acres"));
        assert!(body.contains("David Brown"));
        assert!(body.contains("Organic Tomatoes"));
        assert!(body.contains("Sweet Corn"));
        assert!(body.contains("Carrots"));
        assert!(body.contains("2.50"));
        assert!(!body.contains("Green Valley Farm"));
    }

    #[tokio::test]
    async fn test_farmer_adds_product() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();
        let session_id = sign_in(&server, "mike@greenvalley.com", SAMPLE_FARMER_PASSWORD).await;

        get_as(&server, "/Farmer/AddProduct", &session_id).await.assert_status(StatusCode::OK);

        let response = server
            .post("/Farmer/AddProduct")
            .add_header(header::COOKIE, session_header(&session_id))
            .form(&AddProductForm {
                name: "Wildflower Honey",
                category: "Other",
                production_date: "2024-04-02",
                price: "7.25",
                quantity: "12",
                description: "Raw honey",
            })
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/Farmer/Index");

        let body = get_as(&server, "/Farmer/Index", &session_id).await.text();
        assert!(body.contains("Wildflower Honey"));
        assert!(body.contains("7.25"));
        assert!(body.contains("2024-04-02"));

        let response = server
            .post("/Farmer/AddProduct")
            .add_header(header::COOKIE, session_header(&session_id))
            .form(&AddProductForm {
                name: "",
                category: "Other",
                production_date: "2024-04-02",
                price: "free",
                quantity: "12",
                description: "",
            })
            .await;
        response.assert_status(StatusCode::OK);
        let body = response.text();
        assert!(body.contains("Product name is required."));
        assert!(body.contains("Price must be a number."));
    }

    #[tokio::test]
    async fn test_employee_adds_farmer_who_can_sign_in() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();
        let session_id = sign_in(&server, DEFAULT_EMPLOYEE_EMAIL, DEFAULT_EMPLOYEE_PASSWORD).await;

        let form = AddFarmerForm {
            first_name: "Ann",
            last_name: "Lee",
            farm_name: "Hillside Dairy",
            email: "ann@hillside.com",
            phone_number: "+1-555-0199",
            address: "9 Hill Road",
            password: "Dairy2024",
            confirm_password: "Dairy2024",
        };
        let response = server
            .post("/Employee/AddFarmer")
            .add_header(header::COOKIE, session_header(&session_id))
            .form(&form)
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/Employee/Index");

        let body = get_as(&server, "/Employee/Index", &session_id).await.text();
        assert!(body.contains("Hillside Dairy"));

        // Same email again is refused by the identity layer
        let response = server
            .post("/Employee/AddFarmer")
            .add_header(header::COOKIE, session_header(&session_id))
            .form(&form)
            .await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("is already taken"));

        let farmer_session = sign_in(&server, "ann@hillside.com", "Dairy2024").await;
        let response = get_as(&server, "/Farmer/Index", &farmer_session).await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Hillside Dairy"));
    }

    #[tokio::test]
    async fn test_add_farmer_rejects_weak_password() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();
        let session_id = sign_in(&server, DEFAULT_EMPLOYEE_EMAIL, DEFAULT_EMPLOYEE_PASSWORD).await;

        let response = server
            .post("/Employee/AddFarmer")
            .add_header(header::COOKIE, session_header(&session_id))
            .form(&AddFarmerForm {
                first_name: "Ann",
                last_name: "Lee",
                farm_name: "Hillside Dairy",
                email: "ann@hillside.com",
                phone_number: "+1-555-0199",
                address: "9 Hill Road",
                password: "dairy",
                confirm_password: "dairy",
            })
            .await;
        response.assert_status(StatusCode::OK);
        let body = response.text();
        assert!(body.contains("Passwords must be at least 6 characters."));
        // Entered values are kept, the password is not
        assert!(body.contains("Hillside Dairy"));
        assert!(!body.contains("value=\"dairy\""));
    }

    #[tokio::test]
    async fn test_employee_product_listing_and_filters() {
        let (app, state) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();
        let session_id = sign_in(&server, DEFAULT_EMPLOYEE_EMAIL, DEFAULT_EMPLOYEE_PASSWORD).await;

        let body = get_as(&server, "/Employee/Products", &session_id).await.text();
        assert!(body.contains("Organic Tomatoes"));
        assert!(body.contains("Sweet Corn"));

        let body = get_as(&server, "/Employee/Products?category=Grains&from=&to=", &session_id)
            .await
            .text();
        assert!(body.contains("Sweet Corn"));
        assert!(!body.contains("Organic Tomatoes"));

        let sunrise = crate::marketplace::farmer_summaries(&state.db)
            .await
            .unwrap()
            .into_iter()
            .find(|f| f.farm_name == "Sunrise Organics")
            .unwrap();
        let response = get_as(&server, &format!("/Employee/Products/{}", sunrise.farmer_id), &session_id).await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("Sunrise Organics"));

        get_as(&server, "/Employee/Products/9999", &session_id)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        get_as(&server, "/Employee/Products/abc", &session_id)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        get_as(&server, "/Employee/Products?from=yesterday", &session_id)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        get_as(&server, "/Employee/Products?from=2024-02-01&to=2024-01-01", &session_id)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_product_api() {
        let (app, _) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();
        let session_id = sign_in(&server, DEFAULT_EMPLOYEE_EMAIL, DEFAULT_EMPLOYEE_PASSWORD).await;

        let response = get_as(&server, "/api/v1/products", &session_id).await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<ProductResponse>> = response.json();
        assert!(body.success);
        assert_eq!(body.data.len(), 9);

        let response = get_as(&server, "/api/v1/products?category=Grains", &session_id).await;
        let body: ApiResponse<Vec<ProductResponse>> = response.json();
        assert_eq!(body.data.len(), 3);
        assert!(body.data.iter().all(|p| p.name == "Sweet Corn"));
        assert!(body.data.iter().all(|p| p.price.to_string() == "1.80"));

        let farmer_id = body.data[0].farmer_id;
        let response = get_as(&server, &format!("/api/v1/products?farmer_id={}", farmer_id), &session_id).await;
        let body: ApiResponse<Vec<ProductResponse>> = response.json();
        assert_eq!(body.data.len(), 3);

        get_as(&server, "/api/v1/products?farmer_id=0", &session_id)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        get_as(&server, "/api/v1/products?from=2024-02-01&to=2024-01-01", &session_id)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let (app, state) = setup_seeded_app().await;
        let server = TestServer::new(app).unwrap();
        let session_id = sign_in(&server, DEFAULT_EMPLOYEE_EMAIL, DEFAULT_EMPLOYEE_PASSWORD).await;
        assert!(state.sessions.get(&session_id).await.is_some());

        let response = server
            .post("/Account/Logout")
            .add_header(header::COOKIE, session_header(&session_id))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        assert!(state.sessions.get(&session_id).await.is_none());

        let response = get_as(&server, "/Employee/Index", &session_id).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/Account/Login"));
    }
}
