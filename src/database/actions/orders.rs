use std::collections::HashMap;

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    checkout::{OrderDraft, OrderLine, OrderTotals, PricedLine},
    error::ApiError,
    schema::{Order, OrderItem, OrderRow, OrderStatus, Product, PublicProfile},
};

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    quantity: i32,
    current_unit_price: f64,
    #[sqlx(flatten)]
    product: Product,
}

#[derive(sqlx::FromRow)]
struct OrderWithUserRow {
    #[sqlx(flatten)]
    order: OrderRow,
    user_full_name: String,
    user_image_url: String,
}

async fn load_items(
    pool: &Pool<Postgres>,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderItem>>, ApiError> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
        "
        SELECT oi.order_id, oi.quantity, oi.current_unit_price, p.*
        FROM order_items oi
        INNER JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ANY($1)
        ORDER BY oi.order_id, oi.position
    ",
    )
    .bind(order_ids)
    .fetch_all(pool)
    .await?;

    let mut items: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        items.entry(row.order_id).or_default().push(OrderItem {
            product_id: row.product.id,
            quantity: row.quantity,
            current_unit_price: row.current_unit_price,
            product: Some(row.product),
        })
    });

    Ok(items)
}

async fn attach_items(
    pool: &Pool<Postgres>,
    rows: Vec<(OrderRow, Option<PublicProfile>)>,
) -> Result<Vec<Order>, ApiError> {
    let ids: Vec<Uuid> = rows.iter().map(|(row, _)| row.id).collect();
    let mut items = load_items(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|(row, user)| {
            let lines = items.remove(&row.id).unwrap_or_default();
            let mut order = row.with_items(lines);
            order.user = user;
            order
        })
        .collect())
}

async fn get_order(pool: &Pool<Postgres>, id: Uuid) -> Result<Order, ApiError> {
    let row: OrderRow = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;

    attach_items(pool, vec![(row, None)])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Order"))
}

/// Line indexes sorted by product, so concurrent orders lock stock rows in the same order.
fn lock_order(lines: &[OrderLine]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..lines.len()).collect();
    order.sort_by_key(|&index| (lines[index].product_id, index));
    order
}

/// Each line is a conditional decrement, so two concurrent orders can never
/// both take the last units. Any failing line rolls the whole order back.
pub async fn create_order(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    draft: &OrderDraft,
) -> Result<Order, ApiError> {
    let mut tx = pool.begin().await?;
    let mut priced: Vec<Option<PricedLine>> = vec![None; draft.lines.len()];

    for index in lock_order(&draft.lines) {
        let line = &draft.lines[index];
        let taken: Option<(String, f64)> = sqlx::query_as(
            "
            UPDATE products
            SET quantity_in_stock = quantity_in_stock - $1, updated_at = now()
            WHERE id = $2 AND quantity_in_stock >= $1
            RETURNING name, price;
        ",
        )
        .bind(line.quantity)
        .bind(line.product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (product_name, unit_price) = match taken {
            Some(taken) => taken,
            None => {
                let existing: Option<(String,)> =
                    sqlx::query_as("SELECT name FROM products WHERE id = $1")
                        .bind(line.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                return Err(match existing {
                    Some((name,)) => ApiError::InsufficientStock(name),
                    None => ApiError::not_found(format!("Product {}", line.product_id)),
                });
            }
        };

        priced[index] = Some(PricedLine {
            product_id: line.product_id,
            product_name,
            quantity: line.quantity,
            unit_price,
        });
    }
    let priced: Vec<PricedLine> = priced.into_iter().flatten().collect();

    let totals = OrderTotals::compute(&priced, draft.delivery_charge);
    let (order_id,): (Uuid,) = sqlx::query_as(
        "
        INSERT INTO orders
            (user_id, phone_number, address, subtotal, delivery_charge, total_amount, payment_method, order_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id;
    ",
    )
    .bind(user_id)
    .bind(&draft.phone_number)
    .bind(&draft.address)
    .bind(totals.subtotal)
    .bind(totals.delivery_charge)
    .bind(totals.total_amount)
    .bind(&draft.payment_method)
    .bind(OrderStatus::Pending)
    .fetch_one(&mut *tx)
    .await?;

    for (position, line) in priced.iter().enumerate() {
        sqlx::query(
            "
            INSERT INTO order_items (order_id, position, product_id, quantity, current_unit_price)
            VALUES ($1, $2, $3, $4, $5)
        ",
        )
        .bind(order_id)
        .bind(position as i32)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    log::info!(
        "Order {order_id} placed by {user_id}: {} lines, total {}",
        priced.len(),
        totals.total_amount
    );

    get_order(pool, order_id).await
}

pub async fn list_user_orders(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Vec<Order>, ApiError> {
    let rows: Vec<OrderRow> =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    attach_items(pool, rows.into_iter().map(|row| (row, None)).collect()).await
}

pub async fn list_all_orders(pool: &Pool<Postgres>) -> Result<Vec<Order>, ApiError> {
    let rows: Vec<OrderWithUserRow> = sqlx::query_as(
        "
        SELECT o.*, u.full_name AS user_full_name, u.image_url AS user_image_url
        FROM orders o
        INNER JOIN users u ON u.id = o.user_id
        ORDER BY o.created_at DESC, o.id
    ",
    )
    .fetch_all(pool)
    .await?;

    let rows = rows
        .into_iter()
        .map(|row| {
            let user = PublicProfile {
                id: row.order.user_id,
                full_name: row.user_full_name,
                image_url: row.user_image_url,
            };
            (row.order, Some(user))
        })
        .collect();

    attach_items(pool, rows).await
}

/// The update only lands if the status is still the one the transition was checked against.
pub async fn update_order_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    next: OrderStatus,
) -> Result<Order, ApiError> {
    let (current,): (OrderStatus,) = sqlx::query_as("SELECT order_status FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;

    current.transition(next)?;

    let updated = sqlx::query(
        "
        UPDATE orders SET order_status = $2, updated_at = now()
        WHERE id = $1 AND order_status = $3
    ",
    )
    .bind(id)
    .bind(next)
    .bind(current)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "Order status was changed by another request".to_string(),
        ));
    }

    get_order(pool, id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_rows_are_locked_by_product_id() {
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        let line = |product_id, quantity| OrderLine {
            product_id,
            quantity,
        };

        let cart = [line(high, 1), line(low, 2), line(high, 3)];
        assert_eq!(lock_order(&cart), vec![1, 0, 2]);

        let reversed = [line(low, 1), line(high, 1)];
        assert_eq!(lock_order(&reversed), vec![0, 1]);
    }
}
