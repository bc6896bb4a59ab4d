use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::raffle::submit_raffle,
        handlers::raffle::get_raffle,
        handlers::raffle::update_raffle,
        handlers::raffle::join_raffle,
        handlers::raffle::mark_seen,
        handlers::sponsor::list_sponsors,
        handlers::sponsor::check_membership,
        handlers::user::create_user,
        handlers::user::get_user,
        handlers::user::generate_referral,
    ),
    components(
        schemas(
            PrizeType,
            RaffleStatus,
            ReviewDecision,
            SubmitRaffleRequest,
            EditRaffleRequest,
            RaffleUpdateRequest,
            RaffleResponse,
            JoinRaffleRequest,
            JoinRaffleResponse,
            SponsorChannelResponse,
            CheckMembershipResponse,
            CreateUserRequest,
            UserResponse,
            ReferralLinkResponse,
            ApiError,
        )
    ),
    tags(
        (name = "raffle", description = "Raffle lifecycle API"),
        (name = "sponsor", description = "Sponsor channel membership API"),
        (name = "user", description = "User and referral API"),
    ),
    info(
        title = "StarGift Backend API",
        version = "1.0.0",
        description = "StarGift raffle mini-app REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
