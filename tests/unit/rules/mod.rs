mod trefoil;
