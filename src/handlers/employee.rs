use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::{Document, DocumentStore};
use crate::errors::AppError;
use crate::models::employee::{Employee, EmployeeUpdate, NewEmployee, EMPLOYEES};
use crate::storage::ObjectStore;
use crate::utils::validation::validate_payload;

fn to_employee(document: Document) -> Result<Employee, AppError> {
    let key = document.key.clone();
    Employee::from_document(document)
        .map_err(|err| AppError::upstream(&format!("Malformed employee record {}", key), err))
}

pub async fn create_employee(
    store: web::Data<dyn DocumentStore>,
    new_employee: web::Json<NewEmployee>,
) -> Result<HttpResponse, AppError> {
    let new_employee = new_employee.into_inner();
    validate_payload(&new_employee)?;

    let data = serde_json::to_value(&new_employee)
        .map_err(|err| AppError::upstream("Error adding employee", err))?;

    // Insert-if-absent keeps the duplicate check and the write in one statement.
    let created = store
        .create(EMPLOYEES, &new_employee.id_number, data)
        .await
        .map_err(|err| AppError::upstream("Error adding employee", err))?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "Employee with ID number {} already exists",
                new_employee.id_number
            ))
        })?;

    log::info!("Created employee {}", new_employee.id_number);
    Ok(HttpResponse::Ok().json(to_employee(created)?))
}

pub async fn get_employees(store: web::Data<dyn DocumentStore>) -> Result<HttpResponse, AppError> {
    let employees = store
        .list(EMPLOYEES)
        .await
        .map_err(|err| AppError::upstream("Error fetching employees", err))?
        .into_iter()
        .map(to_employee)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HttpResponse::Ok().json(employees))
}

pub async fn get_employee(
    store: web::Data<dyn DocumentStore>,
    id_number: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let document = store
        .get(EMPLOYEES, &id_number)
        .await
        .map_err(|err| AppError::upstream("Error fetching employee", err))?
        .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;

    Ok(HttpResponse::Ok().json(to_employee(document)?))
}

pub async fn update_employee(
    store: web::Data<dyn DocumentStore>,
    id_number: web::Path<String>,
    updates: web::Json<EmployeeUpdate>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&updates.0)?;

    let patch = serde_json::to_value(&updates.0)
        .map_err(|err| AppError::upstream("Error updating employee", err))?;

    let document = store
        .update(EMPLOYEES, &id_number, patch)
        .await
        .map_err(|err| AppError::upstream("Error updating employee", err))?
        .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully",
        "updatedEmployee": to_employee(document)?,
    })))
}

pub async fn delete_employee(
    store: web::Data<dyn DocumentStore>,
    objects: web::Data<dyn ObjectStore>,
    id_number: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id_number = id_number.into_inner();

    let employee = store
        .get(EMPLOYEES, &id_number)
        .await
        .map_err(|err| AppError::upstream("Error deleting employee", err))?
        .ok_or_else(|| AppError::NotFound("Employee not found".to_string()))
        .and_then(to_employee)?;

    // Image first: a failure here leaves the record (and its reference) intact.
    if let Some(key) = employee.image.as_deref().and_then(|url| objects.key_from_url(url)) {
        objects
            .delete(&key)
            .await
            .map_err(|err| AppError::upstream("Error deleting employee image", err))?;
        log::info!("Deleted image {} of employee {}", key, id_number);
    }

    if !store
        .delete(EMPLOYEES, &id_number)
        .await
        .map_err(|err| AppError::upstream("Error deleting employee", err))?
    {
        return Err(AppError::NotFound("Employee not found".to_string()));
    }

    log::info!("Deleted employee {}", id_number);
    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully",
    })))
}
