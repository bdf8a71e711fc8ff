use actix_web::{get, post, web, HttpResponse, Responder};

use super::{models::KeyState, pipeline::Pipeline};

#[get("")]
async fn peek_notifications(pipeline: web::Data<Pipeline>) -> impl Responder {
    HttpResponse::Ok().json(pipeline.notifier().peek())
}

#[post("/drain")]
async fn drain_notifications(pipeline: web::Data<Pipeline>) -> impl Responder {
    HttpResponse::Ok().json(pipeline.notifier().drain())
}

#[get("/busy")]
async fn busy_states(pipeline: web::Data<Pipeline>) -> impl Responder {
    let response: Vec<KeyState> = pipeline
        .busy()
        .busy_keys()
        .into_iter()
        .map(|key| KeyState {
            state: pipeline.state(&key),
            key,
        })
        .collect();
    HttpResponse::Ok().json(response)
}
