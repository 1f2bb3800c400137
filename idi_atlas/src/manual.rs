/*!

This is the long-form manual for `idi_atlas` and `idiatlas`.

## Datasets

A dataset is a table of strings with a header row. Its schema tells which
column holds the territory, the year, the sector, the value, the observation
flag and the measure. The default schema is the SDMX-CSV layout of Eurostat:

| column        | meaning                                  |
|---------------|------------------------------------------|
| `geo`         | territory (name or code)                 |
| `TIME_PERIOD` | year                                     |
| `sectperf`    | sector of performance (`_T`, `BES`, ...) |
| `OBS_VALUE`   | value                                    |
| `OBS_FLAG`    | observation flag (`p`, `e`, `b`...)      |
| `unit`        | measure (`PC_GDP`, `MIO_EUR`...)         |

Values are read with [`parse_value`](crate::parse_value): commas are accepted as
decimal separator, and empty cells, `:` and anything that is not a number are
"no data". A value of `0` is a real zero: the map shows it with its own color.

## Name resolution

Names are compared after [`normalize_name`](crate::normalize_name) (lowercase,
no diacritics, hyphens as spaces). A name is looked up with these strategies,
in order, and the first record found wins:

1. **Code**: the name is a territory code (`ES30`, `ES-MD`, `DE`, `EU27_2020`),
   or the name of an entity that has one. Records stored under the code or
   under any name of the entity match.
2. **Exact**: the normalized names are equal. The inverted INE form
   (`Madrid, Comunidad de`) is equal to the natural one.
3. **Alias**: the name is a key or a translation in the alias table. Records
   stored under any other form of the same entry match.
4. **Substring**: one name contains the other. Only for names of at least
   four characters.
5. **Special cases**: keyword groups for entities named very differently from
   one source to the other (`Balears (Illes)`, `Canarias (Islas)`, `Czech
   Republic`...).

A name that matches nothing is "no data". It is not an error.

## Color scale

The peer group of a selection is made of the records of the same dataset,
year, sector and measure, one per territory, without the aggregates (European
Union, euro area, national totals) and without zeros and missing values. When
the selection has Spanish regions, the country rows are left out as well.

* no data: neutral gray
* zero: amber
* `max / min > 15`: the gradient is sampled on a logarithmic scale between
  `max(min, 0.1)` and `max` (between `min` and `max` when every value is
  below `0.1`)
* otherwise, five bands: below the first quartile, below the median, below
  the third quartile, below the maximum, and the maximum itself.

The gradient is derived from the color of the sector.

## Configuration file

`idiatlas` reads a JSON file such as:

```json
{
  "outputSettings": { "title": "Gasto en I+D", "locale": "es" },
  "datasets": [
    {
      "name": "gasto",
      "provider": "csv",
      "filePath": "gasto_ccaa.csv",
      "delimiter": ";",
      "territoryColumn": "Comunidad",
      "yearColumn": "Periodo",
      "sectorColumn": "Sector",
      "valueColumn": "Total"
    }
  ],
  "geojson": { "filePath": "ccaa.geojson", "nameProperty": "name" },
  "aliasesPath": "aliases.json",
  "flagsPath": "flags.json",
  "selection": { "dataset": "gasto", "year": "2023", "sector": "_T" }
}
```

Paths are relative to the configuration file. `filePath` may also be an
`http://` or `https://` URL. Providers: `csv` and `xlsx`.

*/
