use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};

use crate::models::{FeedPage, FilterCriteria, PropertyImageRecord, PropertyRecord};

pub(in crate::store) struct PropertyTable<'conn> {
    pub(in crate::store) conn: &'conn Connection,
}

const PROPERTY_COLUMNS: &str = "id, user_id, title, description, price, currency, is_for_rent, \
     location, bedrooms, bathrooms, square_feet, contact_phone, created_at";

fn property_from_row(row: &Row<'_>) -> rusqlite::Result<PropertyRecord> {
    Ok(PropertyRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        currency: row.get(5)?,
        is_for_rent: row.get(6)?,
        location: row.get(7)?,
        bedrooms: row.get(8)?,
        bathrooms: row.get(9)?,
        square_feet: row.get(10)?,
        contact_phone: row.get(11)?,
        created_at: row.get(12)?,
        images: Vec::new(),
    })
}

impl<'conn> PropertyTable<'conn> {
    pub fn insert(&self, record: &PropertyRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO properties (id, user_id, title, description, price, currency, is_for_rent,
                                    location, bedrooms, bathrooms, square_feet, contact_phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                record.id,
                record.user_id,
                record.title,
                record.description,
                record.price,
                record.currency,
                record.is_for_rent,
                record.location,
                record.bedrooms,
                record.bathrooms,
                record.square_feet,
                record.contact_phone,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn attach_image(&self, image: &PropertyImageRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO property_images (id, property_id, image_url, is_primary, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                image.id,
                image.property_id,
                image.image_url,
                image.is_primary,
                image.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<PropertyRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = ?1"),
                params![id],
                property_from_row,
            )
            .optional()?;
        match record {
            Some(record) => {
                let mut records = vec![record];
                self.load_images(&mut records)?;
                Ok(records.pop())
            }
            None => Ok(None),
        }
    }

    /// Filtered feed page, `created_at DESC, id DESC`. Each present filter
    /// field becomes one predicate; the cursor excludes everything at or
    /// before the last seen row.
    pub fn list_filtered(
        &self,
        filter: &FilterCriteria,
        page: &FeedPage,
    ) -> Result<Vec<PropertyRecord>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(location) = &filter.location {
            clauses.push("location = ?".into());
            values.push(Box::new(location.clone()));
        }
        if let Some(min) = filter.min_price {
            clauses.push("price >= ?".into());
            values.push(Box::new(min));
        }
        if let Some(max) = filter.max_price {
            clauses.push("price <= ?".into());
            values.push(Box::new(max));
        }
        if let Some(bedrooms) = filter.bedrooms {
            clauses.push("bedrooms = ?".into());
            values.push(Box::new(bedrooms));
        }
        if let Some(bathrooms) = filter.bathrooms {
            clauses.push("bathrooms = ?".into());
            values.push(Box::new(bathrooms));
        }
        if let Some(is_for_rent) = filter.is_for_rent {
            clauses.push("is_for_rent = ?".into());
            values.push(Box::new(is_for_rent));
        }
        if let Some(min) = filter.min_square_feet {
            clauses.push("square_feet >= ?".into());
            values.push(Box::new(min));
        }
        if let Some(max) = filter.max_square_feet {
            clauses.push("square_feet <= ?".into());
            values.push(Box::new(max));
        }
        if let Some(cutoff) = filter.created_after() {
            clauses.push("created_at >= ?".into());
            values.push(Box::new(cutoff));
        }
        if let Some(currency) = &filter.currency {
            clauses.push("currency = ?".into());
            values.push(Box::new(currency.clone()));
        }
        if let Some(cursor) = &page.after {
            clauses.push("(created_at < ? OR (created_at = ? AND id < ?))".into());
            values.push(Box::new(cursor.created_at.clone()));
            values.push(Box::new(cursor.created_at.clone()));
            values.push(Box::new(cursor.id.clone()));
        }

        let mut sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");
        values.push(Box::new(page.limit as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), property_from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        self.load_images(&mut records)?;
        Ok(records)
    }

    pub fn list_for_owner(&self, user_id: &str) -> Result<Vec<PropertyRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE user_id = ?1 \
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], property_from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        self.load_images(&mut records)?;
        Ok(records)
    }

    /// Owner id appears in the predicate, not just in caller-side gating.
    pub fn delete(&self, id: &str, owner_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM properties WHERE id = ?1 AND user_id = ?2",
            params![id, owner_id],
        )?;
        Ok(affected > 0)
    }

    fn load_images(&self, records: &mut [PropertyRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let placeholders = records.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT id, property_id, image_url, is_primary, created_at \
             FROM property_images WHERE property_id IN ({placeholders}) \
             ORDER BY created_at ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(records.iter().map(|r| r.id.clone())),
            |row| {
                Ok(PropertyImageRecord {
                    id: row.get(0)?,
                    property_id: row.get(1)?,
                    image_url: row.get(2)?,
                    is_primary: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )?;
        let mut by_property: HashMap<String, Vec<PropertyImageRecord>> = HashMap::new();
        for row in rows {
            let image = row?;
            by_property
                .entry(image.property_id.clone())
                .or_default()
                .push(image);
        }
        for record in records.iter_mut() {
            record.images = by_property.remove(&record.id).unwrap_or_default();
        }
        Ok(())
    }
}
